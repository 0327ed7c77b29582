//! Page geometry: viewport position and module regions.
//!
//! The backup visibility scan and the scroll depth sampler both work from
//! this model rather than from a live rendering surface. Positions are in
//! page coordinates (pixels from the top of the document).

use std::collections::BTreeMap;

use crate::types::{ModuleName, ScrollDepth};

/// The visible window onto the page.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Viewport {
    /// Scroll offset from the top of the document.
    pub scroll_top: f64,
    /// Height of the visible area.
    pub height: f64,
}

/// A module's rendered region in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModuleRegion {
    /// Distance from the top of the document to the region's top edge.
    pub top: f64,
    /// Total content height of the region.
    pub height: f64,
}

/// Tracks the viewport and every known module region.
///
/// Regions are keyed by module name; `BTreeMap` keeps scan order
/// deterministic so interleaved detection signals replay identically.
#[derive(Debug, Clone, Default)]
pub struct PageGeometry {
    viewport: Viewport,
    regions: BTreeMap<ModuleName, ModuleRegion>,
}

impl PageGeometry {
    /// Updates the viewport scroll position and height.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Adds or replaces a module region. Modules may mount at any time
    /// after initial page load.
    pub fn upsert_region(&mut self, module: ModuleName, region: ModuleRegion) {
        self.regions.insert(module, region);
    }

    /// Removes a module region. Returns true if it was known.
    pub fn remove_region(&mut self, module: &ModuleName) -> bool {
        self.regions.remove(module).is_some()
    }

    /// Returns true if the module has a known region.
    #[must_use]
    pub fn contains(&self, module: &ModuleName) -> bool {
        self.regions.contains_key(module)
    }

    /// Iterates known modules in name order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleName> {
        self.regions.keys()
    }

    /// Computes the fraction of a module's height currently inside the
    /// viewport, in \[0.0, 1.0\]. Returns None for unknown modules.
    #[must_use]
    pub fn intersection_ratio(&self, module: &ModuleName) -> Option<f64> {
        let region = self.regions.get(module)?;
        if region.height <= 0.0 {
            return Some(0.0);
        }
        let view_top = self.viewport.scroll_top;
        let view_bottom = view_top + self.viewport.height;
        let region_bottom = region.top + region.height;

        let overlap = (view_bottom.min(region_bottom) - view_top.max(region.top)).max(0.0);
        Some(overlap / region.height)
    }

    /// Samples the exposed fraction of a module as a scroll depth
    /// percentage. Returns None for unknown modules.
    #[must_use]
    pub fn scroll_depth(&self, module: &ModuleName) -> Option<ScrollDepth> {
        self.intersection_ratio(module).map(ScrollDepth::from_fraction)
    }
}
