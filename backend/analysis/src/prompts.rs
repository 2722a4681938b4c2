//! Prompts sent to the survey model.
//!
//! Every prompt lives here so the requested JSON schema is defined once and
//! tests can inspect it without a provider.

/// Longest slice of client-extracted PDF text forwarded to the model.
pub const MAX_REFERENCE_TEXT_CHARS: usize = 12_000;

pub const SYSTEM_PROMPT: &str = "You are an expert hydrogeologist who interprets \
groundwater geophysical survey reports (resistivity soundings, VES curves, \
electrical resistivity tomography). You always answer with a single JSON \
object and nothing else.";

/// The JSON shape every prompt asks for.
pub const RESPONSE_SCHEMA: &str = r#"{
  "customerName": "string",
  "surveyId": "string",
  "location": "string",
  "latitude": "string",
  "longitude": "string",
  "surveyDate": "string",
  "percentageChance": number between 0 and 100,
  "chanceLevel": "High | Moderate | Low",
  "recommendedDepth": "string, e.g. 250-300 ft",
  "expectedYield": "string, e.g. 2-3 inch",
  "rockType": "string",
  "waterQuality": "string",
  "analysis": "string, 3-5 sentences interpreting the survey",
  "recommendations": "string",
  "points": [
    { "pointId": "string", "latitude": "string", "longitude": "string", "depth": "string", "chance": number }
  ]
}"#;

/// Prompt for an uploaded survey image; the image itself travels as an attachment.
pub fn image_prompt(file_name: &str) -> String {
    format!(
        "Analyze the attached groundwater survey image ({file_name}). Read every \
value printed on it (customer details, coordinates, resistivity readings, graphs) \
and estimate the chance of finding water and the recommended drilling depth.\n\n\
Return ONLY a JSON object with this structure:\n{RESPONSE_SCHEMA}\n\n\
Use an empty string for any text field you cannot read. No markdown, no commentary."
    )
}

/// Prompt for an uploaded PDF.
///
/// The PDF bytes are not sent; the model works from the file name and, when
/// the client managed to pull a text layer out of the document, that text.
pub fn pdf_prompt(file_name: &str, extracted_text: Option<&str>) -> String {
    let mut prompt = format!(
        "A groundwater survey report was uploaded as the PDF file \"{file_name}\". \
Produce a plausible, professional groundwater survey analysis for it.\n\n\
Return ONLY a JSON object with this structure:\n{RESPONSE_SCHEMA}\n\n\
No markdown, no commentary."
    );

    if let Some(text) = extracted_text.map(str::trim).filter(|t| !t.is_empty()) {
        let text: String = text.chars().take(MAX_REFERENCE_TEXT_CHARS).collect();
        prompt.push_str("\n\nText extracted from the PDF, for reference:\n---\n");
        prompt.push_str(&text);
        prompt.push_str("\n---");
    }
    prompt
}
