// Prompts for the LLM-assisted match summary.

pub const MATCH_SUMMARY_SYSTEM: &str = "You are a concise career advisor on a job board. \
    You explain how well a candidate fits a job listing using only the facts provided. \
    You MUST respond with valid JSON only, shaped as {\"summary\": \"...\"}. \
    Do NOT use markdown code fences.";

/// Placeholders: {title}, {score_percent}, {strong}, {partial}, {missing}, {factors}, {profile_excerpt}
pub const MATCH_SUMMARY_PROMPT_TEMPLATE: &str = "\
Job listing: {title}
Computed match score: {score_percent}%
Skills the candidate clearly has: {strong}
Skills only mentioned in the candidate's text: {partial}
Required or preferred skills the candidate lacks: {missing}
Other factors (1 = match, 0 = mismatch): {factors}

Candidate profile excerpt:
{profile_excerpt}

Write a 2-3 sentence summary for the candidate: what makes them a fit, and the most \
valuable gap to address. Do not restate the numeric score. Do not invent skills.";
