//! Hand gestures: left index finger points, right hand pinches to click and scroll
//!
//! The left hand drives the cursor directly (no smoothing). On the right hand
//! a thumb-index pinch holds the primary button, and an index-middle pinch
//! turns vertical hand motion into wheel clicks.

use crate::config::HandSettings;
use crate::types::{FrameSize, Handedness, HandLandmarks, LandmarkFrame, Point2, PointerCommand, ScreenSize};

/// Thumb-index distance reported for the synthetic open hand
const OPEN_HAND_DISTANCE: f64 = 9999.0 * std::f64::consts::SQRT_2;

/// Button and scroll state driven by right-hand pinches
#[derive(Debug, Clone)]
pub struct ClickController {
    down: bool,
    threshold: f64,
    scroll_mode: bool,
    last_y: Option<f64>,
    /// A button-up was sent for scrolling while `down` stayed set
    released_for_scroll: bool,
    scroll_pinch: f64,
    scroll_gain: f64,
}

impl ClickController {
    pub fn new(settings: &HandSettings) -> Self {
        Self {
            down: false,
            threshold: settings.click_threshold_px,
            scroll_mode: false,
            last_y: None,
            released_for_scroll: false,
            scroll_pinch: settings.scroll_pinch_threshold,
            scroll_gain: settings.scroll_gain,
        }
    }

    pub fn is_down(&self) -> bool {
        self.down
    }

    pub fn is_scrolling(&self) -> bool {
        self.scroll_mode
    }

    /// Single-threshold click on the thumb-index pixel distance
    pub fn update(&mut self, pinch_px: f64, out: &mut Vec<PointerCommand>) {
        let prev = self.down;
        self.down = pinch_px < self.threshold;

        if self.down && !prev {
            // while scrolling the press is held back; leaving scroll mode restores it
            self.released_for_scroll = self.scroll_mode;
            if !self.scroll_mode {
                out.push(PointerCommand::MouseDown);
            }
        } else if !self.down && prev {
            if !self.released_for_scroll {
                out.push(PointerCommand::MouseUp);
            }
            self.released_for_scroll = false;
        }
    }

    /// Click update followed by index-middle scroll handling
    pub fn update_with_landmarks(&mut self, hand: &HandLandmarks, frame: FrameSize, out: &mut Vec<PointerCommand>) {
        if !hand.is_complete() {
            return;
        }
        let (tx, ty) = hand.thumb_tip().to_pixels(frame);
        let (ix, iy) = hand.index_tip().to_pixels(frame);
        let pinch_px = ((tx - ix) as f64).hypot((ty - iy) as f64);
        self.update(pinch_px, out);

        let index = hand.index_tip();
        let middle = hand.middle_tip();
        if index.distance(&middle) < self.scroll_pinch {
            let current_y = (index.y + middle.y) / 2.0;
            match self.last_y {
                None => {
                    log::debug!("Entering scroll mode");
                }
                Some(last_y) => {
                    let amount = ((current_y - last_y) * self.scroll_gain).round() as i32;
                    // hand moving down (y grows) scrolls down
                    if amount.abs() > 1 {
                        out.push(PointerCommand::Scroll(-amount));
                    }
                }
            }
            self.last_y = Some(current_y);
            self.scroll_mode = true;

            if self.down && !self.released_for_scroll {
                out.push(PointerCommand::MouseUp);
                self.released_for_scroll = true;
            }
        } else if self.scroll_mode {
            if self.down && self.released_for_scroll {
                out.push(PointerCommand::MouseDown);
                self.released_for_scroll = false;
            }
            log::debug!("Leaving scroll mode");
            self.scroll_mode = false;
            self.last_y = None;
        }
    }

    /// Drive with a maximally open hand; always leaves the button released
    pub fn release(&mut self, out: &mut Vec<PointerCommand>) {
        self.update(OPEN_HAND_DISTANCE, out);
        // a hand coming back must not scroll by the distance it moved while lost
        self.last_y = None;
    }
}

/// Per-frame hand controller
pub struct HandGestureController {
    click: ClickController,
    screen: ScreenSize,
}

impl HandGestureController {
    pub fn new(settings: &HandSettings, screen: ScreenSize) -> Self {
        Self {
            click: ClickController::new(settings),
            screen,
        }
    }

    pub fn click_state(&self) -> &ClickController {
        &self.click
    }

    /// Run one frame of classified hands, returning commands in issue order
    pub fn process(&mut self, frame: &LandmarkFrame<Vec<HandLandmarks>>) -> Vec<PointerCommand> {
        let mut out = Vec::new();
        let hands: Vec<&HandLandmarks> = frame.landmarks.iter().filter(|h| h.is_complete()).collect();

        if hands.is_empty() {
            self.click.release(&mut out);
            return out;
        }

        for hand in hands {
            match hand.handedness {
                Handedness::Left => {
                    let (x, y) = self.pointer_position(hand.index_tip(), frame.size);
                    out.push(PointerCommand::MoveTo { x, y, duration: None });
                }
                Handedness::Right => self.click.update_with_landmarks(hand, frame.size, &mut out),
            }
        }
        out
    }

    fn pointer_position(&self, tip: Point2, frame: FrameSize) -> (i32, i32) {
        let (px, py) = tip.to_pixels(frame);
        (
            (px as f64 * self.screen.width as f64 / frame.width as f64) as i32,
            (py as f64 * self.screen.height as f64 / frame.height as f64) as i32,
        )
    }
}
