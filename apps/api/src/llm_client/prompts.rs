// Cross-cutting prompt fragments. Each generation task keeps its own prompts
// alongside it (see generation/prompts.rs).

/// Appended to every generation prompt.
pub const TRUTHFULNESS_INSTRUCTION: &str = "\
    Only use information present in the material provided below. \
    Do NOT invent employers, degrees, dates, metrics or skills. \
    If the material does not support a claim, leave it out.";
