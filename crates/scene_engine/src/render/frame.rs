//! Frame lifecycle state machine and the render backend seam
//!
//! A frame always walks the same phases:
//!
//! ```text
//! Idle -> Cleanup -> Draw -> LightUpload -> UiOverlay -> Present -> Idle
//! ```
//!
//! Structural scene changes (sweeping deleted objects, applying queued
//! creations) happen only in `Cleanup`, so nothing that iterates the scene
//! during `Draw` or `UiOverlay` ever sees an index structure change under it.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::render::mesh::Mesh;

/// Phase of the frame currently executing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FramePhase {
    /// Between frames; requests are recorded but not applied
    #[default]
    Idle,
    /// Sweep deleted objects and apply queued commands
    Cleanup,
    /// Draw live objects
    Draw,
    /// Bring the helper program's lights up to date for the overlay
    LightUpload,
    /// Editor/UI pass
    UiOverlay,
    /// Swap buffers
    Present,
}

impl FramePhase {
    /// The phase that legally follows this one
    pub fn next(self) -> Self {
        match self {
            Self::Idle => Self::Cleanup,
            Self::Cleanup => Self::Draw,
            Self::Draw => Self::LightUpload,
            Self::LightUpload => Self::UiOverlay,
            Self::UiOverlay => Self::Present,
            Self::Present => Self::Idle,
        }
    }

    /// Whether scene structure may be mutated in this phase
    pub fn allows_structural_changes(self) -> bool {
        self == Self::Cleanup
    }
}

impl fmt::Display for FramePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Cleanup => "Cleanup",
            Self::Draw => "Draw",
            Self::LightUpload => "LightUpload",
            Self::UiOverlay => "UiOverlay",
            Self::Present => "Present",
        };
        f.write_str(name)
    }
}

/// Frame lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Attempted a transition the state machine does not allow
    #[error("invalid frame transition {from} -> {to}")]
    InvalidTransition {
        /// Current phase
        from: FramePhase,
        /// Requested phase
        to: FramePhase,
    },
}

/// When light data is written to shader programs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LightUploadMode {
    /// Upload into each object's program right before its draw call
    #[default]
    PerObject,
    /// Upload once per distinct program at the start of `Draw`, before the
    /// first draw call
    Batched,
}

/// Per-frame counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number, starting at 1
    pub frame: u64,
    /// Objects removed by this frame's sweep
    pub objects_swept: usize,
    /// Objects drawn
    pub drawn: usize,
    /// Objects skipped because a draw precondition failed
    pub skipped: usize,
    /// Light entries written (summed over every upload)
    pub lights_uploaded: u32,
    /// Uniform writes dropped because the program lacks the uniform
    pub missing_uniforms: usize,
    /// Queued scene commands applied during cleanup
    pub commands_applied: usize,
    /// Whether the ground grid was drawn
    pub grid_drawn: bool,
    /// Whether the registry consistency check ran (debug mode)
    pub registry_checked: bool,
}

/// Tracks the current phase and rejects out-of-order transitions
#[derive(Debug, Default)]
pub struct FrameLifecycle {
    phase: FramePhase,
    frame: u64,
}

impl FrameLifecycle {
    /// Lifecycle resting in `Idle`
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Number of frames started so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Move to `to`, which must be the successor of the current phase
    pub fn advance(&mut self, to: FramePhase) -> Result<(), FrameError> {
        if self.phase.next() != to {
            return Err(FrameError::InvalidTransition { from: self.phase, to });
        }
        if to == FramePhase::Cleanup {
            self.frame += 1;
        }
        log::trace!("Frame {}: {} -> {}", self.frame, self.phase, to);
        self.phase = to;
        Ok(())
    }

    /// Drop back to `Idle` after a frame was abandoned
    pub fn reset(&mut self) {
        if self.phase != FramePhase::Idle {
            log::warn!("Frame {} abandoned in {}", self.frame, self.phase);
        }
        self.phase = FramePhase::Idle;
    }
}

/// Window and context collaborator
///
/// Shader programs receive uniforms through
/// [`UniformSink`](crate::render::shader::UniformSink); the backend only
/// frames the work and issues draw calls.
pub trait RenderBackend {
    /// Clear and prepare a new frame
    fn begin_frame(&mut self);

    /// Issue the draw call for `mesh` with the currently bound program
    fn draw_mesh(&mut self, mesh: &Mesh);

    /// Present the finished frame
    fn present(&mut self);

    /// Whether the window asked to close
    fn should_close(&self) -> bool;
}

/// Backend without a window, for tests and the headless demo
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    frame_limit: Option<u64>,
    frames_presented: u64,
    draw_calls: usize,
    triangles: usize,
    in_frame: bool,
}

impl HeadlessBackend {
    /// Backend that never asks to close
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that asks to close after `frames` presented frames
    pub fn with_frame_limit(frames: u64) -> Self {
        Self {
            frame_limit: Some(frames),
            ..Self::default()
        }
    }

    /// Total draw calls issued
    pub fn draw_calls(&self) -> usize {
        self.draw_calls
    }

    /// Total triangles submitted
    pub fn triangles(&self) -> usize {
        self.triangles
    }

    /// Frames presented
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}

impl RenderBackend for HeadlessBackend {
    fn begin_frame(&mut self) {
        self.in_frame = true;
    }

    fn draw_mesh(&mut self, mesh: &Mesh) {
        if !self.in_frame {
            log::error!("Draw call for mesh '{}' outside of a frame", mesh.name);
            return;
        }
        self.draw_calls += 1;
        self.triangles += mesh.triangle_count();
    }

    fn present(&mut self) {
        self.in_frame = false;
        self.frames_presented += 1;
    }

    fn should_close(&self) -> bool {
        self.frame_limit.is_some_and(|limit| self.frames_presented >= limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle() {
        let mut lifecycle = FrameLifecycle::new();
        let order = [
            FramePhase::Cleanup,
            FramePhase::Draw,
            FramePhase::LightUpload,
            FramePhase::UiOverlay,
            FramePhase::Present,
            FramePhase::Idle,
        ];
        for phase in order {
            lifecycle.advance(phase).unwrap();
        }
        assert_eq!(lifecycle.phase(), FramePhase::Idle);
        assert_eq!(lifecycle.frame(), 1);
    }

    #[test]
    fn test_rejects_skipping_cleanup() {
        let mut lifecycle = FrameLifecycle::new();
        assert_eq!(
            lifecycle.advance(FramePhase::Draw),
            Err(FrameError::InvalidTransition {
                from: FramePhase::Idle,
                to: FramePhase::Draw
            })
        );
        assert_eq!(lifecycle.phase(), FramePhase::Idle);
        assert_eq!(lifecycle.frame(), 0);
    }

    #[test]
    fn test_only_cleanup_mutates_structure() {
        let mutating: Vec<_> = [
            FramePhase::Idle,
            FramePhase::Cleanup,
            FramePhase::Draw,
            FramePhase::LightUpload,
            FramePhase::UiOverlay,
            FramePhase::Present,
        ]
        .into_iter()
        .filter(|phase| phase.allows_structural_changes())
        .collect();
        assert_eq!(mutating, vec![FramePhase::Cleanup]);
    }

    #[test]
    fn test_headless_backend_counts_and_closes() {
        let mut backend = HeadlessBackend::with_frame_limit(2);
        let cube = Mesh::cube();

        backend.draw_mesh(&cube);
        assert_eq!(backend.draw_calls(), 0);

        for _ in 0..2 {
            assert!(!backend.should_close());
            backend.begin_frame();
            backend.draw_mesh(&cube);
            backend.present();
        }
        assert_eq!(backend.draw_calls(), 2);
        assert_eq!(backend.triangles(), 2 * cube.triangle_count());
        assert!(backend.should_close());
    }
}
