use crate::domain::recommendation::RecommendationRequest;

pub fn system_prompt() -> String {
    "You are a disciplined equity research analyst. You weigh technical and fundamental \
evidence, state risks plainly, and never invent data that was not provided."
        .to_string()
}

pub fn user_prompt(req: &RecommendationRequest) -> String {
    let missing = req.technical.missing();
    let missing_note = if missing.is_empty() {
        String::new()
    } else {
        format!(
            "\nThese indicators could not be computed from the available history and are null: {}.\n",
            missing.join(", ")
        )
    };

    [
        "You are a professional stock analyst. Recommend exactly one of: BUY, HOLD, SELL.",
        "Respond with a single JSON object inside a ```json fenced block and nothing else inside the fence.",
        "The object must have exactly these keys:",
        "{",
        "  \"action\": \"BUY\" | \"HOLD\" | \"SELL\",",
        "  \"confidence\": integer 0-100,",
        "  \"technical_summary\": \"...\",",
        "  \"fundamental_summary\": \"...\",",
        "  \"risks\": [\"short risk\", \"...\"],",
        "  \"notes\": \"...\" or null",
        "}",
        "Null fundamental values are unknown, not zero.",
    ]
    .join("\n")
        + &missing_note
        + "\nDATA:\n"
        + &req.payload_json()
}
