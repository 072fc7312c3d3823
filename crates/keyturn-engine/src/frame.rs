//! Frame-tree resolution: find which frame, if any, contains a target
//! element, and leave the session scoped to it.

use crate::session::Session;
use crate::wait::{WaitError, WaitSpec, poll_until, probe};
use keyturn_common::{Locator, SessionError};
use std::collections::VecDeque;
use tracing::debug;

/// A path of frame indices from the document root. The empty path is the
/// top-level document. Immutable value; resolving never mutates an
/// existing context, it returns a new one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameContext {
    path: Vec<u16>,
}

impl FrameContext {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self, index: u16) -> Self {
        let mut path = self.path.clone();
        path.push(index);
        Self { path }
    }

    pub fn path(&self) -> &[u16] {
        &self.path
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Point the session's active scope at this context. Always starts
    /// from the top-level document so stale nesting cannot leak in.
    pub async fn apply<S: Session>(&self, session: &mut S) -> Result<(), SessionError> {
        session.switch_to_default().await?;
        for &index in &self.path {
            session.switch_to_frame(index).await?;
        }
        Ok(())
    }
}

impl std::fmt::Display for FrameContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "top")
        } else {
            let parts: Vec<String> = self.path.iter().map(|i| i.to_string()).collect();
            write!(f, "frame[{}]", parts.join("/"))
        }
    }
}

/// Locates the frame containing a target locator via breadth-first search
/// over the frame tree, bounded by `max_depth` levels of nesting.
pub struct FrameResolver {
    max_depth: usize,
    frame_tags: Locator,
}

impl FrameResolver {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
            frame_tags: Locator::css("iframe").or("frame"),
        }
    }

    /// Find the first frame (document order, breadth-first) whose scope
    /// contains `target`. The top-level document is checked first with
    /// `top_spec` and wins without any child frame being probed; child
    /// frames get the shorter `per_frame_spec` presence check each.
    ///
    /// Probe errors (detached frame, navigation mid-check) count as
    /// non-matches and the search moves on. On a hit the session is left
    /// switched into the winning frame; that scope is authoritative for
    /// subsequent lookups. On a miss the session is restored to top-level
    /// and `None` is returned.
    pub async fn resolve<S: Session>(
        &self,
        session: &mut S,
        target: &Locator,
        top_spec: &WaitSpec,
        per_frame_spec: &WaitSpec,
    ) -> Result<Option<FrameContext>, SessionError> {
        let root = FrameContext::root();
        root.apply(session).await?;
        match Self::probe_presence(session, target, top_spec).await {
            Ok(()) => return Ok(Some(root)),
            Err(WaitError::TimedOut { .. }) => {}
            Err(WaitError::Session(e)) => return Err(e),
        }

        let mut queue: VecDeque<FrameContext> = VecDeque::new();
        if let Some(count) = self.child_count(session, &root).await {
            for index in 0..count {
                queue.push_back(root.child(index));
            }
        }

        while let Some(context) = queue.pop_front() {
            match self.probe_frame(session, &context, target, per_frame_spec).await {
                Ok(true) => {
                    debug!(context = %context, "target located");
                    return Ok(Some(context));
                }
                Ok(false) => {}
                Err(e) => {
                    // Detached frame or mid-check navigation: a non-match,
                    // not a resolution failure.
                    debug!(context = %context, error = %e, "frame probe failed, skipping");
                }
            }

            if context.depth() < self.max_depth
                && let Some(count) = self.child_count(session, &context).await
            {
                for index in 0..count {
                    queue.push_back(context.child(index));
                }
            }
        }

        session.switch_to_default().await?;
        Ok(None)
    }

    /// Switch into `context` and run a short presence check there.
    async fn probe_frame<S: Session>(
        &self,
        session: &mut S,
        context: &FrameContext,
        target: &Locator,
        spec: &WaitSpec,
    ) -> Result<bool, SessionError> {
        context.apply(session).await?;
        match Self::probe_presence(session, target, spec).await {
            Ok(()) => Ok(true),
            Err(WaitError::TimedOut { .. }) => Ok(false),
            Err(WaitError::Session(e)) => Err(e),
        }
    }

    async fn probe_presence<S: Session>(
        session: &mut S,
        target: &Locator,
        spec: &WaitSpec,
    ) -> Result<(), WaitError> {
        let target = target.clone();
        poll_until(
            spec,
            session,
            probe(move |s: &mut S| {
                let target = target.clone();
                Box::pin(async move {
                    let found = s.find_elements(&target).await?;
                    Ok(if found.is_empty() { None } else { Some(()) })
                })
            }),
        )
        .await
    }

    /// Number of child frames of `context`, or `None` when the context
    /// cannot be entered or enumerated.
    async fn child_count<S: Session>(
        &self,
        session: &mut S,
        context: &FrameContext,
    ) -> Option<u16> {
        if context.apply(session).await.is_err() {
            return None;
        }
        match session.find_elements(&self.frame_tags).await {
            Ok(frames) => Some(frames.len() as u16),
            Err(_) => None,
        }
    }
}
