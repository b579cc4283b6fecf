//! System prompts sent with every page image.
//!
//! [`system_prompt`] picks the full prompt or the compact fast-mode prompt.

/// Prompt used in normal mode.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You transcribe a single rendered page of a PDF document into Markdown.

Rules:

1. CONTENT
   - Transcribe every piece of text on the page, in natural reading order
   - For multi-column layouts, finish one column before starting the next
   - Do not summarise, paraphrase or translate

2. STRUCTURE
   - Headings: # for the document title, ## for sections, ### and deeper for subsections
   - Lists: "-" for bullets, "1." for numbered items, nested lists indented by two spaces
   - Keep **bold** and *italic* emphasis where the page shows it

3. TABLES
   - Use GitHub-flavoured pipe tables with a header separator row
   - Fall back to an HTML <table> only when cells span rows or columns

4. MATH AND CODE
   - Inline math as $...$, display math as $$...$$ using LaTeX
   - Code listings in fenced blocks with a language tag when it is evident

5. FIGURES
   - Describe a figure in one italic line, e.g. *Figure 2: loss curve over training steps*
   - Never invent image links

6. SKIP
   - Running headers, running footers and page numbers
   - Purely decorative rules and borders

7. OUTPUT
   - Return only the Markdown for this page
   - No surrounding ```markdown fence, no commentary"#;

/// Prompt used in fast mode.
pub const FAST_SYSTEM_PROMPT: &str = r#"Transcribe this PDF page to Markdown. Keep all text in reading order, use # headings, lists and pipe tables where the page has them, write math as LaTeX. Skip page numbers and running headers. Output only the Markdown, without a code fence."#;

/// The system prompt for the given mode.
pub fn system_prompt(fast_mode: bool) -> &'static str {
    if fast_mode {
        FAST_SYSTEM_PROMPT
    } else {
        DEFAULT_SYSTEM_PROMPT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_prompt_is_shorter() {
        assert!(FAST_SYSTEM_PROMPT.len() < DEFAULT_SYSTEM_PROMPT.len());
        assert_eq!(system_prompt(true), FAST_SYSTEM_PROMPT);
        assert_eq!(system_prompt(false), DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn both_prompts_forbid_fences() {
        for prompt in [DEFAULT_SYSTEM_PROMPT, FAST_SYSTEM_PROMPT] {
            assert!(prompt.contains("fence"));
        }
    }
}
