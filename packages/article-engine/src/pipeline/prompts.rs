//! Prompt templates for every model call in the pipeline.
//!
//! Templates use `{placeholder}` substitution via the `format_*` helpers.
//! Wording is deliberately plain; the contracts that matter are the JSON
//! shapes each template requests.

/// System prompt shared by planning/classification calls.
pub const SYSTEM_PLANNER: &str = "You are the content planning engine for an online publication. \
Follow the requested output format exactly.";

/// System prompt shared by prose-writing calls.
pub const SYSTEM_WRITER: &str = "You are a professional writer for an online publication. \
Write engaging, accurate prose in the requested voice and output clean HTML.";

/// Keyword suitability classification.
pub const SUITABILITY_PROMPT: &str = r#"You screen keywords for a product-review publication.

Keyword: {keyword}

Decide whether this keyword is usable: on-topic for consumer product and hobbyist content, safe, and non-promotional for a specific brand we cannot verify.

Output JSON:
{"suitable": "yes" | "no", "reason": "one sentence"}"#;

/// Author persona selection from the configured roster.
pub const AUTHOR_SELECT_PROMPT: &str = r#"Pick the best-fit author for an article.

Keyword: {keyword}

Roster:
{roster}

Output JSON:
{"author_id": <roster id number>}"#;

/// Structured keyword analysis.
pub const KEYWORD_ANALYSIS_PROMPT: &str = r#"Analyze this keyword for long-form content planning.

Keyword: {keyword}

Top competing results:
{serp_context}

Output JSON with ALL of these fields:
{
    "search_intent": "what the searcher wants",
    "content_format": "the format the results reward (listicle, guide, review...)",
    "article_type": "ListOfProducts" | "Informational",
    "model_framework": "copywriting framework to follow (AIDA, PAS...)",
    "semantic_keywords": ["related terms in priority order"]
}"#;

/// Outline draft, product-roundup shape.
pub const OUTLINE_PRODUCTS_PROMPT: &str = r#"Create an article outline for a ranked product roundup.

Keyword: {keyword}
Search intent: {search_intent}
Framework: {framework}
Semantic keywords: {semantic_keywords}

Structure: an introduction chapter, then a "Top Rated" chapter whose subchapters are the individual products (each with a short verdict headline), then supporting chapters (buying guide, FAQs), then a conclusion chapter.

Output JSON:
{
    "title": "...",
    "slug": "url-slug",
    "excerpt": "1-2 sentences",
    "chapters": [
        {
            "name": "...",
            "model_role": "what this chapter accomplishes",
            "target_length": <words>,
            "semantic_keywords": ["..."],
            "subchapters": [
                {"name": "...", "headline": "short verdict", "model_role": "...", "target_length": <words>}
            ]
        }
    ]
}"#;

/// Outline draft, informational shape.
pub const OUTLINE_INFORMATIONAL_PROMPT: &str = r#"Create an article outline for an informational piece.

Keyword: {keyword}
Search intent: {search_intent}
Framework: {framework}
Semantic keywords: {semantic_keywords}

Structure: an introduction chapter, topical chapters (with subchapters where a topic needs breaking down), an FAQ chapter near the end, and a conclusion chapter.

Output JSON (same shape):
{
    "title": "...",
    "slug": "url-slug",
    "excerpt": "1-2 sentences",
    "chapters": [
        {
            "name": "...",
            "model_role": "...",
            "target_length": <words>,
            "semantic_keywords": ["..."],
            "subchapters": [
                {"name": "...", "model_role": "...", "target_length": <words>}
            ]
        }
    ]
}"#;

/// Second outline pass: add author voice and hooks to every node.
pub const OUTLINE_ENRICH_PROMPT: &str = r#"Enrich this outline with writing guidance.

Author persona:
{author}

Outline:
{outline}

Return the SAME JSON tree with two fields added to every chapter and subchapter:
- "author_info": one sentence on how this author would approach the section
- "hook_text": a hook idea to open the section with

Do not add, remove, rename, or reorder chapters or subchapters."#;

/// Introduction section.
pub const INTRODUCTION_PROMPT: &str = r#"Write the introduction for "{title}".

Keyword: {keyword}
Semantic keywords: {semantic_keywords}
Author voice: {author_info}
Hook idea: {hook_text}
The article covers these sections: {section_names}

Open with a strong hook (question, surprising fact, or relatable scenario), preview what the article covers, and keep it under {target_length} words. Output clean HTML paragraphs only, no headings."#;

/// Conclusion section.
pub const CONCLUSION_PROMPT: &str = r#"Write the conclusion for "{title}".

Keyword: {keyword}
Author voice: {author_info}

Summarize the key takeaways and end with a clear next step for the reader. Under {target_length} words. Output clean HTML paragraphs only, no headings."#;

/// FAQ section with schema-friendly Q/A markup.
pub const FAQ_PROMPT: &str = r#"Write a FAQ section for "{title}".

Produce 4-6 common questions with concise answers. Output HTML only:
each question in an <h3>, each answer in a <p> directly after it."#;

/// Regular chapter prose.
pub const CHAPTER_PROMPT: &str = r#"Write the chapter "{name}" for "{title}".

Role of this chapter: {model_role}
Keyword: {keyword}
Semantic keywords: {semantic_keywords}
Author voice: {author_info}
Hook idea: {hook_text}

Around {target_length} words. Output clean HTML (paragraphs, lists where natural), no headings."#;

/// Product review subchapter.
pub const PRODUCT_PROMPT: &str = r#"Write a product review section for "{name}" in the article "{title}".

Verdict headline: {headline}
Role: {model_role}
Author voice: {author_info}
The roundup also covers: {sibling_products}

Cover what stands out, who it suits, and one honest drawback; frame it against the other products where useful. Around {target_length} words. Output clean HTML, no headings."#;

/// Regular subchapter prose.
pub const SUBCHAPTER_PROMPT: &str = r#"Write the section "{name}" (part of "{parent_name}") for "{title}".

Role: {model_role}
Keyword: {keyword}
Semantic keywords: {semantic_keywords}
Author voice: {author_info}
Hook idea: {hook_text}

Around {target_length} words. Output clean HTML, no headings."#;

/// Candidate anchor phrases for citation links.
pub const ANCHOR_PHRASES_PROMPT: &str = r#"Find phrases worth citing in this section text.

Section: {section_name}
Text:
{text}

Pick {count} short phrases (2-6 words) copied VERBATIM from the text that make factual claims a reader might want a source for.

Output JSON:
{"phrases": ["...", "..."]}"#;

/// Search query for one citation.
pub const CITATION_QUERY_PROMPT: &str = r#"Write one web search query to find an authoritative source.

Article: {title}
Section: {section_name}
Phrase to support: "{phrase}"
Sentence it appears in: "{context}"

Output only the query text."#;

/// Pick the best citation URL from search results.
pub const CITATION_PICK_PROMPT: &str = r#"Pick the single best source to cite for: "{phrase}"

Candidates:
{candidates}

Prefer authoritative, non-commercial pages that directly support the claim. If none are suitable, say so.

Output JSON:
{"url": "<one of the candidate urls>" | "none"}"#;

/// Image search phrase for a section.
pub const IMAGE_QUERY_PROMPT: &str = r#"Write a short image search phrase (3-6 words) for a photo to illustrate this section.

Article: {title}
Section: {section_name}{parent_line}

Output only the phrase."#;

/// Pick the best image candidate by description.
pub const IMAGE_PICK_PROMPT: &str = r#"Pick the best photo to illustrate the section "{section_name}".

Candidates:
{candidates}

Prefer clear, relevant, non-watermarked photos. If none fit, say so.

Output JSON:
{"choice": <candidate number> | "none"}"#;

/// Video search phrase for a section.
pub const VIDEO_QUERY_PROMPT: &str = r#"Write a short video search phrase (3-6 words) for a video that complements this section.

Article: {title}
Section: {section_name}

Output only the phrase."#;

/// Pick the best video candidate by title and description.
pub const VIDEO_PICK_PROMPT: &str = r#"Pick the best video to embed in the section "{section_name}".

Candidates:
{candidates}

Prefer videos that directly demonstrate or explain the section topic. If none fit, say so.

Output JSON:
{"choice": <candidate number> | "none"}"#;

/// Product comparison table.
pub const COMPARISON_TABLE_PROMPT: &str = r#"Create an HTML comparison table for the article "{title}".

Products, in ranking order:
{products}

Columns: Product, Best For, Standout Feature, Rating. One row per product. Output only the <table> element."#;

/// Featured image generation prompt.
pub const FEATURED_IMAGE_PROMPT: &str = r#"Write a one-sentence photographic prompt for a blog cover image for the article "{title}". Describe a concrete scene; no text, logos, or people's faces. Output only the prompt."#;

/// Category recommendation against the existing tree.
pub const CATEGORY_PROMPT: &str = r#"Choose a category for an article.

Search intent: {search_intent}
Keyword: {keyword}

Existing categories:
{categories}

Recommend the best existing category by exact name, or propose one new category name if nothing fits.

Output JSON:
{"category": "name", "create_new": true | false}"#;

/// Related keywords for internal-linking metadata.
pub const INTERNAL_KEYWORDS_PROMPT: &str = r#"List {count} short keyword phrases closely related to "{keyword}" that this site's other articles might target, for internal linking.

Output JSON:
{"keywords": ["...", "..."]}"#;

/// Substitute `{name}` placeholders in a template.
pub fn fill(template: &str, pairs: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in pairs {
        out = out.replace(&format!("{{{}}}", name), value);
    }
    out
}

/// Render numbered candidates for pick prompts.
pub fn numbered_candidates(lines: &[String]) -> String {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{}. {}", i + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_replaces_all_occurrences() {
        let out = fill("{a} and {b} and {a}", &[("a", "x"), ("b", "y")]);
        assert_eq!(out, "x and y and x");
    }

    #[test]
    fn test_fill_leaves_unknown_placeholders() {
        let out = fill("{a} {unknown}", &[("a", "x")]);
        assert_eq!(out, "x {unknown}");
    }

    #[test]
    fn test_numbered_candidates() {
        let out = numbered_candidates(&["first".to_string(), "second".to_string()]);
        assert_eq!(out, "1. first\n2. second");
    }
}
