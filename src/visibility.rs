use kuchiki::NodeRef;
use serde::{Deserialize, Serialize};

use crate::config::VisibilitySettings;

/// Axis-aligned box in page coordinates (CSS pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Grows the box by `margin` on every side (a root margin).
    pub fn expand(&self, margin: f64) -> Rect {
        Rect::new(
            self.x - margin,
            self.y - margin,
            self.width + 2.0 * margin,
            self.height + 2.0 * margin,
        )
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = (self.x + self.width).min(other.x + other.width);
        let bottom = (self.y + self.height).min(other.y + other.height);
        if right < left || bottom < top {
            return None;
        }
        Some(Rect::new(left, top, right - left, bottom - top))
    }
}

/// Share of `target` inside `root`, in `0.0..=1.0`. An empty target counts
/// as fully visible when it touches the root.
pub fn intersection_ratio(target: &Rect, root: &Rect) -> f64 {
    match target.intersection(root) {
        Some(overlap) if target.area() > 0.0 => (overlap.area() / target.area()).clamp(0.0, 1.0),
        Some(_) => 1.0,
        None => 0.0,
    }
}

#[derive(Debug, Clone)]
pub struct IntersectionEntry {
    pub target: NodeRef,
    pub ratio: f64,
    pub is_intersecting: bool,
}

struct Observed {
    node: NodeRef,
    intersecting: Option<bool>,
}

/// Threshold-crossing visibility tracking for a set of elements.
///
/// The first measurement reports every observed element; later measurements
/// only report elements whose intersecting state changed.
pub struct VisibilityObserver {
    threshold: f64,
    root_margin: f64,
    observed: Vec<Observed>,
}

impl VisibilityObserver {
    pub fn new(settings: &VisibilitySettings) -> Self {
        Self {
            threshold: settings.threshold,
            root_margin: settings.root_margin_px,
            observed: Vec::new(),
        }
    }

    /// Returns `false` if `node` is already observed.
    pub fn observe(&mut self, node: NodeRef) -> bool {
        if self.observed.iter().any(|entry| entry.node == node) {
            return false;
        }
        self.observed.push(Observed {
            node,
            intersecting: None,
        });
        true
    }

    pub fn observed_count(&self) -> usize {
        self.observed.len()
    }

    /// Measures every observed element against `viewport`. Elements `layout`
    /// cannot place are treated as not rendered.
    pub fn measure<F>(&mut self, viewport: Rect, layout: F) -> Vec<IntersectionEntry>
    where
        F: Fn(&NodeRef) -> Option<Rect>,
    {
        let root = viewport.expand(self.root_margin);
        let mut entries = Vec::new();

        for observed in &mut self.observed {
            let ratio = layout(&observed.node)
                .map(|rect| intersection_ratio(&rect, &root))
                .unwrap_or(0.0);
            let is_intersecting = ratio > 0.0 && ratio >= self.threshold;

            if observed.intersecting == Some(is_intersecting) {
                continue;
            }
            observed.intersecting = Some(is_intersecting);
            entries.push(IntersectionEntry {
                target: observed.node.clone(),
                ratio,
                is_intersecting,
            });
        }

        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuchiki::parse_html;
    use kuchiki::traits::*;

    #[test]
    fn ratio_of_partially_visible_box() {
        let viewport = Rect::new(0.0, 0.0, 100.0, 100.0);
        let card = Rect::new(0.0, 80.0, 100.0, 40.0);
        assert!((intersection_ratio(&card, &viewport) - 0.5).abs() < f64::EPSILON);
        assert_eq!(intersection_ratio(&Rect::new(0.0, 300.0, 10.0, 10.0), &viewport), 0.0);
    }

    #[test]
    fn root_margin_pre_triggers() {
        let settings = VisibilitySettings::default();
        let mut observer = VisibilityObserver::new(&settings);
        let doc = parse_html().one("<div id=a></div>");
        let node = doc.select_first("#a").unwrap().as_node().clone();
        assert!(observer.observe(node.clone()));
        assert!(!observer.observe(node));

        // 30px below the fold, inside the 50px margin.
        let entries = observer.measure(Rect::new(0.0, 0.0, 800.0, 600.0), |_| {
            Some(Rect::new(0.0, 630.0, 300.0, 100.0))
        });
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_intersecting);

        let again = observer.measure(Rect::new(0.0, 10.0, 800.0, 600.0), |_| {
            Some(Rect::new(0.0, 630.0, 300.0, 100.0))
        });
        assert!(again.is_empty());
    }

    #[test]
    fn below_threshold_is_not_intersecting() {
        let mut observer = VisibilityObserver::new(&VisibilitySettings {
            threshold: 0.1,
            root_margin_px: 0.0,
        });
        let doc = parse_html().one("<div id=a></div>");
        observer.observe(doc.select_first("#a").unwrap().as_node().clone());

        let entries = observer.measure(Rect::new(0.0, 0.0, 100.0, 100.0), |_| {
            Some(Rect::new(0.0, 95.0, 100.0, 100.0))
        });
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].is_intersecting);
    }
}
