use serde::{Deserialize, Serialize};
use std::fmt;

/// Where on the image the watermark is pinned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    #[serde(alias = "center")]
    #[value(alias = "center")]
    MiddleCenter,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    #[default]
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Start,
    Center,
    End,
}

impl Anchor {
    pub const ALL: [Anchor; 9] = [
        Anchor::TopLeft,
        Anchor::TopCenter,
        Anchor::TopRight,
        Anchor::MiddleLeft,
        Anchor::MiddleCenter,
        Anchor::MiddleRight,
        Anchor::BottomLeft,
        Anchor::BottomCenter,
        Anchor::BottomRight,
    ];

    fn alignment(self) -> (Align, Align) {
        match self {
            Anchor::TopLeft => (Align::Start, Align::Start),
            Anchor::TopCenter => (Align::Center, Align::Start),
            Anchor::TopRight => (Align::End, Align::Start),
            Anchor::MiddleLeft => (Align::Start, Align::Center),
            Anchor::MiddleCenter => (Align::Center, Align::Center),
            Anchor::MiddleRight => (Align::End, Align::Center),
            Anchor::BottomLeft => (Align::Start, Align::End),
            Anchor::BottomCenter => (Align::Center, Align::End),
            Anchor::BottomRight => (Align::End, Align::End),
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Anchor::TopLeft => "top-left",
            Anchor::TopCenter => "top-center",
            Anchor::TopRight => "top-right",
            Anchor::MiddleLeft => "middle-left",
            Anchor::MiddleCenter => "middle-center",
            Anchor::MiddleRight => "middle-right",
            Anchor::BottomLeft => "bottom-left",
            Anchor::BottomCenter => "bottom-center",
            Anchor::BottomRight => "bottom-right",
        };
        f.write_str(name)
    }
}

/// Either a grid anchor with a margin, or explicit pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Placement {
    Anchor(Anchor),
    Custom { x: u32, y: u32 },
}

impl Default for Placement {
    fn default() -> Self {
        Placement::Anchor(Anchor::default())
    }
}

/// Top-left corner for a `mark` sized box on an `image` sized canvas.
///
/// The result is clamped so the box never starts outside the canvas; when the
/// box is larger than the canvas on an axis that coordinate is 0.
pub fn calculate_position(
    image: (u32, u32),
    mark: (u32, u32),
    anchor: Anchor,
    margin: u32,
) -> (u32, u32) {
    let (horizontal, vertical) = anchor.alignment();
    (
        axis_position(image.0, mark.0, horizontal, margin),
        axis_position(image.1, mark.1, vertical, margin),
    )
}

/// Resolve any placement to a clamped top-left corner.
pub fn place(image: (u32, u32), mark: (u32, u32), placement: Placement, margin: u32) -> (u32, u32) {
    match placement {
        Placement::Anchor(anchor) => calculate_position(image, mark, anchor, margin),
        Placement::Custom { x, y } => (
            x.min(image.0.saturating_sub(mark.0)),
            y.min(image.1.saturating_sub(mark.1)),
        ),
    }
}

fn axis_position(extent: u32, size: u32, align: Align, margin: u32) -> u32 {
    let free = extent.saturating_sub(size);
    let wanted = match align {
        Align::Start => margin,
        Align::Center => free / 2,
        Align::End => free.saturating_sub(margin),
    };
    wanted.min(free)
}

/// Font size scaled to the image: about 1/18 of the short side, within 8..=1000.
pub fn auto_font_size(width: u32, height: u32) -> f32 {
    (width.min(height) / 18).clamp(8, 1000) as f32
}
