//! Binding of adjacent source comments to declarations.

mod brief;

pub use brief::{derive_brief, strip_decoration};

use crate::annotate::AnnotationPass;
use crate::builder::UnitTree;
use crate::config::DocumentationConfig;
use crate::declaration::{CommentBlock, CommentStyle};
use crate::error::Diagnostic;
use crate::frontend::{CommentPlacement, RawComment};

/// Picks at most one comment block per declaration.
///
/// Preceding comments win over a trailing one. Consecutive preceding comments
/// form one block; its style follows the comment closest to the declaration.
pub struct DocumentationBinder {
    doc_comments_only: bool,
    attach_trailing: bool,
}

impl DocumentationBinder {
    pub fn new(config: &DocumentationConfig) -> Self {
        Self {
            doc_comments_only: config.doc_comments_only,
            attach_trailing: config.attach_trailing,
        }
    }

    /// The comment block for a declaration with these adjacent comments.
    pub fn bind(&self, comments: &[RawComment]) -> Option<CommentBlock> {
        let preceding: Vec<&RawComment> = comments
            .iter()
            .filter(|c| c.placement == CommentPlacement::Preceding)
            .filter(|c| !is_trailing_marker(&c.text))
            .filter(|c| self.accepts(&c.text))
            .collect();

        if let Some(last) = preceding.last() {
            let style = if last.text.trim_start().starts_with("/*") {
                CommentStyle::PrecedingBlock
            } else {
                CommentStyle::PrecedingLine
            };
            let raw_text = preceding
                .iter()
                .map(|c| c.text.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            return Some(block(raw_text, style));
        }

        if !self.attach_trailing {
            return None;
        }
        comments
            .iter()
            .filter(|c| c.placement == CommentPlacement::Trailing)
            .find(|c| self.accepts(&c.text))
            .map(|c| block(c.text.clone(), CommentStyle::Trailing))
    }

    fn accepts(&self, text: &str) -> bool {
        !self.doc_comments_only || is_doc_comment(text)
    }
}

fn block(raw_text: String, style: CommentStyle) -> CommentBlock {
    CommentBlock {
        brief_text: derive_brief(&raw_text),
        raw_text,
        style,
    }
}

/// `///`, `//!`, `/**` and `/*!` comments.
pub fn is_doc_comment(text: &str) -> bool {
    let text = text.trim_start();
    (text.starts_with("///") && !text.starts_with("////"))
        || text.starts_with("//!")
        || (text.starts_with("/**") && !text.starts_with("/**/"))
        || text.starts_with("/*!")
}

/// Comments that document the declaration before them (`///<` and friends).
fn is_trailing_marker(text: &str) -> bool {
    let text = text.trim_start();
    ["///<", "//!<", "/**<", "/*!<"]
        .iter()
        .any(|marker| text.starts_with(*marker))
}

impl AnnotationPass for DocumentationBinder {
    fn name(&self) -> &'static str {
        "documentation"
    }

    fn annotate(&self, tree: &mut UnitTree) -> Vec<Diagnostic> {
        let arena = tree.arena_mut();
        for id in arena.preorder() {
            let decl = arena.node_mut(id);
            let comments = std::mem::take(&mut decl.pending.raw_comments);
            if comments.is_empty() {
                continue;
            }
            decl.comment = self.bind(&comments);
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binder() -> DocumentationBinder {
        DocumentationBinder::new(&DocumentationConfig::default())
    }

    #[test]
    fn test_preceding_line_run_is_one_block() {
        let block = binder()
            .bind(&[
                RawComment::preceding("/// @brief Class c1"),
                RawComment::preceding("/// And more comment"),
            ])
            .unwrap();
        assert_eq!(block.style, CommentStyle::PrecedingLine);
        assert_eq!(block.raw_text, "/// @brief Class c1\n/// And more comment");
        assert_eq!(block.brief_text, "Class c1 And more comment");
    }

    #[test]
    fn test_preceding_wins_over_trailing() {
        let block = binder()
            .bind(&[
                RawComment::preceding("/** Function f3 */"),
                RawComment::trailing("// Comment 2"),
            ])
            .unwrap();
        assert_eq!(block.style, CommentStyle::PrecedingBlock);
        assert_eq!(block.brief_text, "Function f3");
    }

    #[test]
    fn test_trailing_used_when_alone() {
        let block = binder()
            .bind(&[RawComment::trailing("///< constructor")])
            .unwrap();
        assert_eq!(block.style, CommentStyle::Trailing);
        assert_eq!(block.brief_text, "constructor");

        let binder = DocumentationBinder::new(&DocumentationConfig {
            attach_trailing: false,
            ..DocumentationConfig::default()
        });
        assert!(binder.bind(&[RawComment::trailing("// late")]).is_none());
    }

    #[test]
    fn test_trailing_markers_never_document_the_next_declaration() {
        assert!(binder().bind(&[RawComment::preceding("///< about x")]).is_none());
        let block = binder()
            .bind(&[
                RawComment::preceding("///< about x"),
                RawComment::trailing("// about y"),
            ])
            .unwrap();
        assert_eq!(block.style, CommentStyle::Trailing);
    }

    #[test]
    fn test_doc_comments_only_filters_plain_comments() {
        let binder = DocumentationBinder::new(&DocumentationConfig {
            doc_comments_only: true,
            ..DocumentationConfig::default()
        });
        assert!(binder.bind(&[RawComment::preceding("// plain")]).is_none());
        assert!(binder.bind(&[RawComment::preceding("/* plain */")]).is_none());
        assert!(binder.bind(&[RawComment::preceding("/*! doc */")]).is_some());
        assert!(binder.bind(&[RawComment::preceding("//! doc")]).is_some());
    }

    #[test]
    fn test_no_comments_no_block() {
        assert!(binder().bind(&[]).is_none());
    }

    #[test]
    fn test_is_doc_comment() {
        assert!(is_doc_comment("/// text"));
        assert!(is_doc_comment("/** text */"));
        assert!(!is_doc_comment("//// banner"));
        assert!(!is_doc_comment("/**/"));
        assert!(!is_doc_comment("// text"));
    }
}
