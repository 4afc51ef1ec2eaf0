//! Incremental assembly of a streamed assistant response.

use crate::core::reasoning::ReasoningPolicy;
use crate::core::render::RenderedView;

/// Accumulates streamed fragments and keeps a rendered view in step with them.
#[derive(Debug, Default)]
pub struct StreamAssembler {
    raw: String,
    policy: ReasoningPolicy,
    view: RenderedView,
    fragments: usize,
}

/// The settled state of a response once its stream has ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalResponse {
    pub raw: String,
    pub view: RenderedView,
}

impl StreamAssembler {
    pub fn new(policy: ReasoningPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Append one fragment and re-render the whole buffer.
    pub fn push_fragment(&mut self, fragment: &str) -> &RenderedView {
        let piece = self.policy.apply(fragment);
        self.raw.push_str(&piece);
        self.fragments += 1;
        self.view = RenderedView::render(&self.raw);
        &self.view
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn view(&self) -> &RenderedView {
        &self.view
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    pub fn finalize(self) -> FinalResponse {
        let view = RenderedView::render(&self.raw);
        FinalResponse {
            raw: self.raw,
            view,
        }
    }
}
