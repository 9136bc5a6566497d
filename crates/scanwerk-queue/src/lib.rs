// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk Queue: the ordered scan queue, the per-item processing pipeline,
// and the async orchestrator that runs pipeline work off the caller's task.
// Bridges the core domain types in `scanwerk-core` and the image stages in
// `scanwerk-vision`.

pub mod item;
pub mod orchestrator;
pub mod pipeline;
pub mod queue;

pub use item::ItemView;
pub use orchestrator::{Orchestrator, Worker};
pub use pipeline::{EditOutput, Pipeline, PipelineInput, PipelineOutput, Stage};
pub use queue::{Direction, Edit, EditTicket, ProcessingTicket, ScanQueue};
