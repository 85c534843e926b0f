use crate::input::InputPart;

/// Tones offered for listing descriptions
pub const LISTING_STYLES: &[&str] = &[
    "Standard Professional (Zillow style)",
    "Luxury & Elegant",
    "Investment / Fixer-Upper",
];

/// Tones offered for site audits
pub const AUDIT_STYLES: &[&str] = &[
    "Executive Briefing",
    "Technical Deep-Dive",
    "Plain-English Summary",
];

/// Fixed sentence the model must emit when the photos are not of a property
pub const NON_PROPERTY_REFUSAL: &str =
    "⚠️ These photos do not appear to be real estate. Please upload property photos.";

/// Adjectives banned from generated listings
pub const FLUFF_WORDS: &[&str] = &[
    "tapestry",
    "symphony",
    "nestled",
    "meticulously",
    "breathtaking",
    "oasis",
    "bespoke",
];

/// Which instruction template to render
#[derive(Debug, Clone)]
pub enum Template {
    /// Property photos to a market-ready listing description
    PhotoListing,
    /// Scraped page text to a GEO visibility audit
    SiteAudit {
        url: String,
        industry: Option<String>,
        competitor: Option<String>,
    },
}

/// Ordered request content: the instruction always goes on the wire first,
/// content parts follow in caller order
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub instruction: String,
    pub parts: Vec<InputPart>,
}

/// Render the instruction for a style and attach the content parts in order
pub fn build_request(style: &str, parts: Vec<InputPart>, template: &Template) -> GenerationRequest {
    let instruction = match template {
        Template::PhotoListing => listing_instruction(style),
        Template::SiteAudit {
            url,
            industry,
            competitor,
        } => audit_instruction(style, url, industry.as_deref(), competitor.as_deref()),
    };

    GenerationRequest { instruction, parts }
}

fn listing_instruction(style: &str) -> String {
    let banned = banned_words_clause();
    format!(
        r#"Role: You are a direct, pragmatic Real Estate Agent with 20 years of experience.
Task: Write a listing description based ONLY on the visual evidence in these images.

Tone: {style}

CRITICAL RULES (Do NOT break these):
1. If the images are NOT of a house, room, or building, simply output: "{NON_PROPERTY_REFUSAL}"
2. NO FLUFF. Do not use words like: {banned}
3. Be factual. Describe the floors (wood/tile?), the light (windows?), the appliances.
4. Format clearly:
   - A catchy 5-word Headline.
   - One paragraph of summary (max 3 sentences).
   - A bulleted list of 5 specific features visible in the photos."#
    )
}

fn audit_instruction(
    style: &str,
    url: &str,
    industry: Option<&str>,
    competitor: Option<&str>,
) -> String {
    let mut instruction = format!(
        r#"Role: You are a blunt, experienced GEO (Generative Engine Optimization) consultant.
Task: Audit how visible and quotable the page at {url} is for AI-driven search, based ONLY on the page text supplied after these instructions.

Tone: {style}
"#
    );

    if let Some(industry) = industry {
        instruction.push_str(&format!("Industry: {industry}\n"));
    }
    if let Some(competitor) = competitor {
        instruction.push_str(&format!("Compare against: {competitor}\n"));
    }

    instruction.push_str(
        r#"
CRITICAL RULES (Do NOT break these):
1. Judge ONLY what the supplied text supports. If the text is too thin to audit, say so plainly instead of guessing.
2. NO SCORES without evidence. Every claim must point at something in the text.
3. Be specific. Name the missing entities, the unanswered questions, and the absent structure.
4. Format clearly:
   - A one-line verdict.
   - One paragraph of summary (max 3 sentences).
   - A numbered list of the 5 highest-impact fixes, most important first."#,
    );

    instruction
}

/// Denylist rendered the way it is spoken: "tapestry," "symphony," ... or "bespoke."
fn banned_words_clause() -> String {
    match FLUFF_WORDS.split_last() {
        Some((last, rest)) => {
            let quoted: Vec<String> = rest.iter().map(|w| format!("\"{},\"", w)).collect();
            format!("{} or \"{}.\"", quoted.join(" "), last)
        }
        None => String::new(),
    }
}
