//! Prompts for timetable extraction.
//!
//! The whole value of the extraction lives in this text, so it is kept in one
//! place where tests can inspect it. Callers can override the system prompt via
//! [`crate::config::ExtractionConfig::system_prompt`]; the worked example is
//! always appended so the model sees the exact output shape.

/// Default system prompt: task, schema and rules.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an expert at reading school timetables. Your task is to extract every scheduled time block for the teacher from the timetable you are given, which is either an image or text recovered from a document.

Reply with a single JSON object and nothing else, using exactly this schema:

{
  "metadata": {
    "teacher_name": string or null,
    "class_name": string or null,
    "term": string or null,
    "school_name": string or null,
    "extraction_confidence": number between 0 and 1
  },
  "timeblocks": [
    {
      "day": "Monday" | "Tuesday" | "Wednesday" | "Thursday" | "Friday" | "Saturday" | "Sunday",
      "start_time": "HH:MM" (24-hour),
      "end_time": "HH:MM" (24-hour),
      "duration_minutes": integer,
      "subject": string,
      "subject_type": "academic" | "break" | "administrative" | "other",
      "notes": string or null,
      "confidence": number between 0 and 1
    }
  ]
}

Rules:

1. COMPLETENESS
   - Include every lesson, break, lunch, registration, assembly and meeting
   - A block that spans several days appears once per day
   - Order blocks by day, then by start time

2. TIMES
   - Convert 12-hour times to 24-hour "HH:MM"
   - end_time must be later than start_time
   - If only a period number is shown, use the period times printed on the timetable

3. SUBJECTS
   - Copy the subject text exactly as written; do not expand abbreviations
   - subject_type is "break" for breaks, lunch and recess; "administrative" for registration, assemblies, meetings, duties and planning time; "academic" for taught lessons; "other" for anything else

4. CONFIDENCE
   - confidence reflects how sure you are about that block (1 = certain)
   - Lower it for blurred, handwritten or ambiguous cells

5. OUTPUT FORMAT
   - Output ONLY the JSON object
   - Do NOT wrap it in code fences
   - Do NOT add commentary or explanations
   - Use null for metadata you cannot find; never invent values"#;

/// Worked example appended to every system prompt.
pub const WORKED_EXAMPLE: &str = r#"Example. For a timetable containing "Monday 9:00-9:30 Maths" and "Monday 10:30-10:45 Break", the correct reply is:

{"metadata":{"teacher_name":null,"class_name":null,"term":null,"school_name":null,"extraction_confidence":0.9},"timeblocks":[{"day":"Monday","start_time":"09:00","end_time":"09:30","duration_minutes":30,"subject":"Maths","subject_type":"academic","notes":null,"confidence":0.95},{"day":"Monday","start_time":"10:30","end_time":"10:45","duration_minutes":15,"subject":"Break","subject_type":"break","notes":null,"confidence":0.95}]}"#;

/// User turn accompanying an image.
pub const IMAGE_INSTRUCTION: &str =
    "Extract the timetable from this image. Reply with the JSON object only.";

/// Full system message: the base prompt (default or override) plus the example.
pub fn system_message(custom: Option<&str>) -> String {
    format!(
        "{}\n\n{}",
        custom.unwrap_or(DEFAULT_SYSTEM_PROMPT),
        WORKED_EXAMPLE
    )
}

/// User turn wrapping text recovered by OCR or PDF extraction.
pub fn text_instruction(extracted: &str) -> String {
    format!(
        "Extract the timetable from the following text, which was recovered from the document and may contain recognition errors or lost column alignment.\n\n\"\"\"\n{}\n\"\"\"\n\nReply with the JSON object only.",
        extracted.trim()
    )
}
