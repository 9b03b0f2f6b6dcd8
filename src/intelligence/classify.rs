//! Rule-based content classification
//!
//! Categories are tested in a fixed precedence order and the first one with
//! a keyword present wins. Code keywords are literal code markers only, so
//! prose that merely mentions an API is not classified as code.

use crate::types::Category;

/// Keyword rules in precedence order; `General` is the fallback
const CATEGORY_RULES: &[(Category, &[&str])] = &[
    (
        Category::Code,
        &[
            "```",
            "code",
            "function",
            "class ",
            "def ",
            "const ",
            "import ",
            "=>",
            "syntax",
            "compile",
            "programming",
            "variable",
        ],
    ),
    (
        Category::Troubleshooting,
        &[
            "error",
            "bug",
            "fix",
            "issue",
            "problem",
            "debug",
            "crash",
            "exception",
            "failed",
            "broken",
            "not working",
            "resolve",
        ],
    ),
    (
        Category::HowTo,
        &[
            "how to",
            "tutorial",
            "guide",
            "step",
            "instruction",
            "setup",
            "set up",
            "install",
            "configure",
            "walkthrough",
        ],
    ),
    (
        Category::Explanation,
        &[
            "explain",
            "what is",
            "definition",
            "meaning",
            "concept",
            "theory",
            "understand",
            "describe",
        ],
    ),
    (
        Category::Comparison,
        &[
            "compare",
            "comparison",
            "difference",
            " vs ",
            " vs.",
            "versus",
            "alternative",
            "pros and cons",
            "advantages",
            "disadvantages",
        ],
    ),
    (
        Category::Recommendation,
        &[
            "recommend",
            "suggest",
            "best practice",
            "should",
            "advice",
            "tips",
            "prefer",
        ],
    ),
    (
        Category::Example,
        &[
            "example",
            "sample",
            "for instance",
            "such as",
            "demonstrat",
            "illustrat",
        ],
    ),
];

/// Classify content into a [`Category`]
pub fn classify(content: &str) -> Category {
    let lower = content.to_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| lower.contains(kw)))
        .map(|(category, _)| *category)
        .unwrap_or_default()
}

/// Keywords that trigger a category (empty for `General`)
pub fn category_keywords(category: Category) -> &'static [&'static str] {
    CATEGORY_RULES
        .iter()
        .find(|(c, _)| *c == category)
        .map(|(_, keywords)| *keywords)
        .unwrap_or(&[])
}
