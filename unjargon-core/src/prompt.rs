//! Prompt construction for the simplification pipeline.
//!
//! Pure string assembly: a level style directive, a normal or short-input
//! intro, one of seven domain guidance blocks, and the literal source text.
//! Deterministic for identical inputs; model selection and sampling are the
//! caller's concern.

use crate::config::LimitsConfig;
use crate::types::{Domain, Level};

/// System instruction enforcing the three-section output contract.
pub const SYSTEM_PROMPT: &str = r#"You are an AI assistant that simplifies input into EXACTLY 3 numbered sections:

1. Summary
2. Main Points
3. Helpful Definitions

Hard formatting rules:
- Use the three numbered headers EXACTLY as written above (no bold, no colons, no extra punctuation).
- Start each section on its own line; content follows on subsequent lines.

Main Points:
- Under "Main Points", use ONLY hyphens "-" for each new item. If there is an example, include it as the LAST bullet prefixed with "Example:".

Helpful Definitions:
- Under "Helpful Definitions", list EVERY important term, acronym, or cited law/section in the input, Summary, or Main Points using EXACTLY: "- **Term**: definition".

Never add extra sections. If a section is empty, output "N/A"."#;

/// System instruction for the image-description variant.
pub const IMAGE_SYSTEM_PROMPT: &str = r#"You are an assistant that describes images and outputs in EXACTLY 3 sections:
1. Summary
2. Main Points
3. Helpful Definitions

Follow the same strict formatting rules as instructed by the user."#;

/// Style directive for the requested reading level.
pub fn level_style(level: Level) -> &'static str {
    match level {
        Level::Beginner => {
            "Write as if you were talking to a little kid. Use short sentences, \
             very simple words, and a friendly tone. Avoid jargon."
        }
        Level::Advanced => {
            "Write at an adult undergraduate college-educated level. Be concise \
             and precise; use accurate terminology with brief clarifications."
        }
        Level::Professional => {
            "Write for professional/PhD readers. Be technically rigorous, retain \
             precise terms and nuance, and avoid over-simplification. Discuss \
             terms in-depth, include potential biases and perhaps even \
             controversies for context."
        }
        Level::Intermediate => {
            "Write at ~high school grade level. Be clear and approachable, with \
             light terminology explained."
        }
    }
}

/// Short-input heuristic: very few words, or a trimmed length below the
/// character floor. Tuned against observed model behavior, best effort only.
pub fn is_short_input(text: &str, limits: &LimitsConfig) -> bool {
    let trimmed = text.trim();
    let word_count = trimmed.split_whitespace().count();
    word_count > 0
        && (word_count <= limits.short_input_max_words
            || trimmed.chars().count() < limits.short_input_min_chars)
}

/// Truncate to a character-count prefix without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn normal_intro(level: Level) -> String {
    format!(
        r#"{style}

Please rewrite the following text using EXACTLY these three sections:

1. Summary – A concise plain-English overview of what the text says, does, or changes. If there are only a few words inputted, then discuss the definitions and any related information on those words or combinations of words, just as if someone had searched it up on Google and summarized the related info. (aim for recent info./news).
2. Main Points – Bullet the major takeaways using "- " (who/what changed, actions, steps, implications). If you include an example, make it the LAST bullet and prefix it with "Example:".
3. Helpful Definitions – Define **every** important term, acronym, or cited law/section in the form "**Term**: definition". If something repeats, include it anyway for clarity. Define them just as if someone had searched it up on Google and summarized the related info. (aim for recent info./news).

Constraints:
- Output MUST contain exactly these three numbered headers (no bold, no colons).
- Do NOT add extra sections or rename sections.
- Do NOT restate/bold the section titles inside the section bodies.
- If a section is empty, write "N/A"."#,
        style = level_style(level)
    )
}

fn short_intro(level: Level) -> String {
    format!(
        r#"{style}

The input is a very short phrase/keyword. Produce an informative mini-brief using EXACTLY these three sections. Use general background knowledge to expand.
Do **NOT** write "N/A" in any section, even if the input is only a few words.

1. Summary – A clear overview of what the term/topic is and why it matters. If relevant, mention notable recent developments at a high level.
2. Main Points – 4–8 hyphen bullets ("- ") covering key properties, uses, risks/benefits, context; if you include an example, make it the LAST bullet and prefix with "Example:".
3. Helpful Definitions – "**Term**: definition" lines for important related concepts, acronyms, or sub-terms a reader would likely encounter when researching this topic.

Constraints:
- Output MUST contain exactly these three numbered headers (no bold, no colons).
- Do NOT add extra sections or rename sections.
- Do NOT restate/bold the section titles inside the section bodies.
- Never write "N/A"; if information is minimal, expand with concise background."#,
        style = level_style(level)
    )
}

/// Build the full user prompt for a text simplification request.
pub fn build_prompt(domain: Domain, text: &str, level: Level, limits: &LimitsConfig) -> String {
    let intro = if is_short_input(text, limits) {
        short_intro(level)
    } else {
        normal_intro(level)
    };

    match domain {
        Domain::Legal => format!(
            r#"You are a legal assistant helping regular people understand complex legal documents.

{intro}

Domain guidance (LEGAL):
- In Main Points: enumerate clauses, amendments, obligations, rights, penalties, and effective dates.
- If an example helps, add it as the last bullet: "- Example: …".
- In Helpful Definitions: include EVERY statute/section citation (e.g., "section 174A(b)", "56(b)(2)"), legal terms of art, and agency/authority names.

Legal text:
{text}"#
        ),
        Domain::Medical => format!(
            r#"You are a healthcare explainer helping patients understand medical information.

{intro}

Domain guidance (MEDICAL):
- In Main Points: include diagnosis/condition, purpose of test/procedure, key steps, risks/benefits, aftercare, and timelines.
- In Helpful Definitions: define clinical terms, abbreviations, labs, drug names/classes, and procedures.

Medical text:
{text}"#
        ),
        Domain::Government => format!(
            r#"You are a civic guide helping people understand government programs, policies, and rights.

{intro}

Domain guidance (GOVERNMENT):
- In Main Points: cover eligibility, benefits/obligations, responsible agency, how to apply/comply, deadlines, and penalties (if any).
- In Helpful Definitions: define agencies, program names, legal references (titles/sections/forms).

Government text:
{text}"#
        ),
        Domain::Financial => format!(
            r#"You are a finance explainer helping people understand financial documents, statements, and policies.

{intro}

Domain guidance (FINANCIAL):
- In Main Points: focus on fees/costs/rates, limits/caps, timelines, obligations/rights, and practical impacts/risks.
- In Helpful Definitions: define financial terms, ratios, instruments, and regulatory references (e.g., SEC, 10-K, APR).

Financial text:
{text}"#
        ),
        Domain::Education => format!(
            r#"You are an education explainer helping students, parents, and educators understand academic policies and resources.

{intro}

Domain guidance (EDUCATION):
- In Main Points: outline requirements, steps, timelines, grading/credit impacts, and available support/resources.
- In Helpful Definitions: define educational terms, programs, acronyms, and administrative processes.

Education text:
{text}"#
        ),
        Domain::Nutrition => format!(
            r#"You are a nutrition explainer helping people understand foods, labels, and dietary guidance.

{intro}

Domain guidance (NUTRITION):
- In Main Points: highlight serving size, calories per serving, macronutrients (protein, carbs, fat), added sugars, sodium, fiber, notable vitamins/minerals (%DV), and any allergens/additives. Call out high/low red flags.
- If relevant, end with "- Example: …" showing how someone would use this info in a day.
- In Helpful Definitions: define terms like "% Daily Value", "added sugars", "saturated fat", "trans fat", "fiber", "ultra-processed", "net carbs", "complete protein", and any specialized terms mentioned. For any common/important term previously mentioned, whether in the generated "main points" earlier or in the inputted text, recommend the official VERIFIED FDA/government health guideline suggestion **NUMERICAL** suggested daily value/intake if applicable, such as BUT NOT LIMITED TO "Recommended daily intake of vitamin C: adult men need ~90 mg and adult women need about ~75 mg".

Nutrition text:
{text}"#
        ),
        Domain::General => format!(
            r#"You are a plain-language explainer helping people understand complex text.

{intro}

Domain guidance (GENERAL):
- In Main Points: summarize the key actions/ideas and any steps or implications.
- In Helpful Definitions: define any uncommon terms, acronyms, or references.

Text:
{text}"#
        ),
    }
}

/// Build the user prompt for the image-description variant. No domain
/// guidance and no embedded source text; the image rides alongside.
pub fn build_image_prompt(level: Level) -> String {
    format!(
        r#"{style}

Please rewrite what you can infer from the image using EXACTLY these three sections:

1. Summary – A concise plain-English overview of what the image shows.
2. Main Points – Bullet the major takeaways using "- " (facts, counts, notable elements, implications). If you include an example, make it the LAST bullet and prefix it with "Example:".
3. Helpful Definitions – Define **every** important term or concept in the form "**Term**: definition".

Constraints:
- Output MUST contain exactly these three numbered headers (no bolding the headers, no colons on the header line).
- Do NOT add extra sections or rename sections.
- If a section is empty, write "N/A"."#,
        style = level_style(level)
    )
}
