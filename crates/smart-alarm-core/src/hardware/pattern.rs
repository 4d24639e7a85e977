//! LED light patterns as precomputed frame sequences.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const OFF: Color = Color::rgb(0, 0, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Position on a red -> blue -> green color wheel, `0..=255`.
    pub fn wheel(pos: u8) -> Self {
        match pos {
            0..=84 => Color::rgb(pos * 3, 255 - pos * 3, 0),
            85..=169 => {
                let p = pos - 85;
                Color::rgb(255 - p * 3, 0, p * 3)
            }
            _ => {
                let p = pos - 170;
                Color::rgb(0, p * 3, 255 - p * 3)
            }
        }
    }
}

/// Full strip state shown for `hold` before the next frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub pixels: Vec<Color>,
    pub hold: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightPattern {
    /// Rainbow cycle.
    #[default]
    Default,
    Pulse,
    Chase,
    Solid,
}

impl LightPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            LightPattern::Default => "default",
            LightPattern::Pulse => "pulse",
            LightPattern::Chase => "chase",
            LightPattern::Solid => "solid",
        }
    }

    /// Unknown names fall back to solid red.
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or(LightPattern::Solid)
    }

    /// One cycle of the pattern on a strip of `num_pixels` LEDs. The
    /// controller repeats the cycle until stopped.
    pub fn frames(&self, num_pixels: usize) -> Vec<Frame> {
        match self {
            LightPattern::Default => rainbow(num_pixels),
            LightPattern::Pulse => pulse(num_pixels),
            LightPattern::Chase => chase(num_pixels),
            LightPattern::Solid => vec![Frame {
                pixels: vec![Color::RED; num_pixels],
                hold: Duration::from_millis(500),
            }],
        }
    }
}

impl FromStr for LightPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "rainbow" => Ok(LightPattern::Default),
            "pulse" => Ok(LightPattern::Pulse),
            "chase" => Ok(LightPattern::Chase),
            "solid" => Ok(LightPattern::Solid),
            other => Err(format!("unknown light pattern '{other}'")),
        }
    }
}

impl fmt::Display for LightPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const FAST: Duration = Duration::from_millis(20);

fn rainbow(n: usize) -> Vec<Frame> {
    (0..256usize)
        .map(|j| Frame {
            pixels: (0..n)
                .map(|i| Color::wheel(((i * 256 / n.max(1) + j) & 255) as u8))
                .collect(),
            hold: FAST,
        })
        .collect()
}

fn pulse(n: usize) -> Vec<Frame> {
    let up = (0..255u16).step_by(5);
    let down = (1..=255u16).rev().step_by(5);
    up.chain(down)
        .map(|level| Frame {
            pixels: vec![Color::rgb(level as u8, 0, 0); n],
            hold: FAST,
        })
        .collect()
}

fn chase(n: usize) -> Vec<Frame> {
    let mut pixels = vec![Color::OFF; n];
    let mut frames = Vec::with_capacity(3 * n);
    for color in [Color::RED, Color::GREEN, Color::BLUE] {
        for i in 0..n {
            pixels[i] = color;
            frames.push(Frame {
                pixels: pixels.clone(),
                hold: Duration::from_millis(50),
            });
        }
    }
    frames
}
