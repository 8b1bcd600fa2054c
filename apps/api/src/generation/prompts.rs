// Prompt constants for CV and cover-letter tailoring.
// Placeholders are `{name}`, filled by `fill_placeholders` in one pass.

pub const CV_SYSTEM: &str = "You are a helpful assistant that updates LaTeX resumes.";

/// Placeholders: `{language}`, `{title}`, `{company}`, `{job_description}`,
/// `{company_description}`, `{template}` and `{truthfulness}`.
pub const CV_PROMPT_TEMPLATE: &str = r#"Tailor the LaTeX CV content below to the job posting.
{truthfulness}
Keep the LaTeX structure intact and return the full content block, starting at
\begin{greenbox} and ending with \vspace{2pt}.

Language: {language}
Job Title: {title}
Company: {company}

Job Description:
{job_description}

Company Description:
{company_description}

LaTeX CV Template:
{template}"#;

pub const COVER_LETTER_SYSTEM: &str =
    "You are a cover letter generator. Be clear, concise, and professional.";

/// Placeholders: `{tone}`, `{language}`, `{max_words}`, `{title}`, `{company}`,
/// `{job_description}`, `{company_description}`, `{resume}` and `{truthfulness}`.
pub const COVER_LETTER_PROMPT_TEMPLATE: &str = r#"Write a short, professional job application letter.
{truthfulness}
Tone: {tone}
Language: {language}
Max words: {max_words}

== Job Title ==
{title}

== Company ==
{company}

== Job Description ==
{job_description}

== Company Description ==
{company_description}

== CV ==
{resume}
"#;
