// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: the owned raster buffer shared by every pipeline stage.

pub mod raster;

pub use raster::RasterImage;
