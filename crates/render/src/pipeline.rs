//! The content transformation pipeline.

use crate::node::RenderNode;
use crate::options::TransformOptions;
use crate::sanitize::sanitize;
use crate::tables::{EmojiResolver, MentionResolver};
use crate::transform::{NodeTransform, lift_code_blocks, recognize_links, substitute_emoji};
use crate::tree::build_tree;
use fedimark_core::{ContentWarning, Diagnostics, collapse_code, tokenize};
use serde::Serialize;
use std::borrow::Cow;

/// Side tables consulted while transforming one status.
///
/// Both lookups are optional; a missing emoji resolver disables emoji
/// substitution and a missing mention resolver makes every mention a stub.
#[derive(Clone, Copy, Default)]
pub struct TransformContext<'a> {
    /// Custom emoji lookup.
    pub emojis: Option<&'a dyn EmojiResolver>,
    /// Mention lookup by profile URL.
    pub mentions: Option<&'a dyn MentionResolver>,
}

impl<'a> TransformContext<'a> {
    /// A context without side tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the emoji resolver.
    pub fn with_emojis(mut self, emojis: &'a dyn EmojiResolver) -> Self {
        self.emojis = Some(emojis);
        self
    }

    /// Sets the mention resolver.
    pub fn with_mentions(mut self, mentions: &'a dyn MentionResolver) -> Self {
        self.mentions = Some(mentions);
        self
    }
}

/// Render tree plus the recoveries made while building it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformOutput {
    /// The render forest.
    pub nodes: Vec<RenderNode>,
    /// Recoverable conditions observed.
    #[serde(skip)]
    pub diagnostics: Diagnostics,
}

/// Configurable transformer with optional custom node transforms.
pub struct ContentPipeline {
    options: TransformOptions,
    transforms: Vec<Box<dyn NodeTransform>>,
}

impl Default for ContentPipeline {
    fn default() -> Self {
        Self::new(TransformOptions::default())
    }
}

impl ContentPipeline {
    /// Create a pipeline with the given options.
    pub fn new(options: TransformOptions) -> Self {
        Self {
            options,
            transforms: Vec::new(),
        }
    }

    /// Options in effect.
    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Add a node transform, run after the built-in stages.
    pub fn add_transform<T: NodeTransform + 'static>(&mut self, transform: T) {
        self.transforms.push(Box::new(transform));
    }

    /// Builder form of [`ContentPipeline::add_transform`].
    pub fn with_transform<T: NodeTransform + 'static>(mut self, transform: T) -> Self {
        self.add_transform(transform);
        self
    }

    /// Transforms `raw` into a render forest. Never fails.
    pub fn run(&self, raw: &str, context: &TransformContext<'_>) -> TransformOutput {
        let mut diagnostics = Diagnostics::new();
        if raw.is_empty() {
            return TransformOutput {
                nodes: Vec::new(),
                diagnostics,
            };
        }

        let markup: Cow<'_, str> = if self.options.enable_sanitize {
            match sanitize(raw) {
                Ok(clean) => Cow::Owned(clean),
                Err(err) => {
                    log::warn!("sanitizer failed, rendering raw text: {}", err);
                    diagnostics.add_structural(0, err.to_string());
                    return TransformOutput {
                        nodes: vec![RenderNode::text(raw)],
                        diagnostics,
                    };
                }
            }
        } else {
            Cow::Borrowed(raw)
        };

        let tokens = tokenize(&markup, &mut diagnostics);
        let tokens = collapse_code(tokens, self.options.code_options(), &mut diagnostics);
        let mut nodes = build_tree(tokens, &mut diagnostics);
        recognize_links(&mut nodes, &self.options, context.mentions, &mut diagnostics);
        lift_code_blocks(&mut nodes);
        if self.options.enable_emoji
            && let Some(emojis) = context.emojis
        {
            substitute_emoji(&mut nodes, emojis, &mut diagnostics);
        }

        for transform in &self.transforms {
            transform.transform(&mut nodes);
        }

        TransformOutput { nodes, diagnostics }
    }
}

/// Transforms status HTML with default options.
///
/// ```
/// use fedimark_render::{RenderNode, TransformContext, transform};
///
/// let nodes = transform("<p>hello</p>", &TransformContext::new());
/// assert_eq!(
///     nodes,
///     vec![RenderNode::element("p", vec![], vec![RenderNode::text("hello")])]
/// );
/// ```
pub fn transform(raw: &str, context: &TransformContext<'_>) -> Vec<RenderNode> {
    transform_with_diagnostics(raw, context).nodes
}

/// Transforms status HTML with explicit options.
pub fn transform_with_options(
    raw: &str,
    context: &TransformContext<'_>,
    options: TransformOptions,
) -> TransformOutput {
    ContentPipeline::new(options).run(raw, context)
}

/// Transforms status HTML with default options, keeping diagnostics.
pub fn transform_with_diagnostics(raw: &str, context: &TransformContext<'_>) -> TransformOutput {
    ContentPipeline::default().run(raw, context)
}

/// Returns true if any warning indicates the output may differ from the author's intent.
pub fn is_degraded(diagnostics: &Diagnostics) -> bool {
    diagnostics.warnings.iter().any(|w| {
        matches!(
            w,
            ContentWarning::StructuralDegradation { .. } | ContentWarning::UnterminatedFence { .. }
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{CustomEmoji, MentionAccount};

    #[test]
    fn empty_input_yields_empty_forest() {
        let output = transform_with_diagnostics("", &TransformContext::new());
        assert!(output.nodes.is_empty());
        assert!(!output.diagnostics.has_warnings());
    }

    #[test]
    fn closures_serve_as_resolvers() {
        let emojis = |name: &str| {
            (name == "blob").then(|| CustomEmoji {
                shortcode: "blob".into(),
                url: "u".into(),
                static_url: "s".into(),
                visible_in_picker: false,
                category: None,
            })
        };
        let mentions = |href: &str| {
            Some(MentionAccount {
                id: "1".into(),
                username: "me".into(),
                url: href.into(),
                acct: "me".into(),
            })
        };
        let context = TransformContext::new()
            .with_emojis(&emojis)
            .with_mentions(&mentions);
        let nodes = transform(
            r#"<p><span class="h-card"><a href="https://x.social/@me" class="u-url mention">@<span>me</span></a></span> :blob:</p>"#,
            &context,
        );
        let children = nodes[0].children();
        assert!(matches!(&children[0].children()[0], RenderNode::MentionLink { href, .. } if href == "/@me"));
        assert!(matches!(children.last(), Some(RenderNode::Emoji { .. })));
    }

    #[test]
    fn emoji_can_be_disabled() {
        let emojis = |_: &str| -> Option<CustomEmoji> { panic!("resolver must not be called") };
        let context = TransformContext::new().with_emojis(&emojis);
        let options = TransformOptions {
            enable_emoji: false,
            ..Default::default()
        };
        let output = transform_with_options(":x:", &context, options);
        assert_eq!(output.nodes, vec![RenderNode::text(":x:")]);
    }

    #[test]
    fn custom_transforms_run_last_in_order() {
        let pipeline = ContentPipeline::default()
            .with_transform(|nodes: &mut Vec<RenderNode>| nodes.push(RenderNode::text("1")))
            .with_transform(|nodes: &mut Vec<RenderNode>| nodes.push(RenderNode::text("2")));
        let output = pipeline.run("<p>x</p>", &TransformContext::new());
        assert_eq!(output.nodes[1..], [RenderNode::text("1"), RenderNode::text("2")]);
    }

    #[test]
    fn unterminated_fence_is_degraded_but_literal() {
        let output = transform_with_diagnostics("<p>```ts<br>let a = 1</p>", &TransformContext::new());
        assert!(is_degraded(&output.diagnostics));
        assert_eq!(output.diagnostics.unterminated_fences().count(), 1);
        assert_eq!(output.nodes[0].children()[0], RenderNode::text("```ts"));
    }

    #[test]
    fn sanitizer_can_be_disabled() {
        let options = TransformOptions {
            enable_sanitize: false,
            ..Default::default()
        };
        let output = transform_with_options("<div>a</div>", &TransformContext::new(), options);
        assert!(output.nodes[0].is_element("div"));

        let sanitized = transform("<div>a</div>", &TransformContext::new());
        assert_eq!(sanitized, vec![RenderNode::text("a")]);
    }
}
