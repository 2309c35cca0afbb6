// Prompt fragments shared by every interview prompt.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps generated content tied to what the candidate actually provided.
pub const CANDIDATE_GROUNDING: &str = "\
    Base everything on the job description and resume provided. \
    Do NOT invent employers, projects, or credentials the resume does not mention.";
