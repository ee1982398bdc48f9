use std::time::{Duration, Instant};

use eframe::egui;
use image::RgbaImage;
use image::imageops::{self, FilterType};
use log::{debug, warn};

use super::cache::BoundedCache;
use super::i18n::I18n;
use crate::env;

/// Layouts kept around so resizing back to a recent size is free.
const MAX_CACHED_LAYOUTS: usize = 5;
const RESIZE_DEBOUNCE: Duration = Duration::from_millis(150);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuAction {
    Launch,
    Versions,
    OpenGame,
    OpenChannel,
    PlayMusic,
    Configure,
}

struct ButtonSpec {
    image: &'static str,
    /// x, y, width, height as fractions of the window.
    rect: [f32; 4],
    action: MenuAction,
}

const BUTTONS: [ButtonSpec; 6] = [
    ButtonSpec {
        image: "1.png",
        rect: [0.71, 0.38, 0.29, 0.62],
        action: MenuAction::Launch,
    },
    ButtonSpec {
        image: "2.png",
        rect: [0.00, 0.38, 0.70, 0.15],
        action: MenuAction::Versions,
    },
    ButtonSpec {
        image: "3.png",
        rect: [0.00, 0.01, 0.25, 0.36],
        action: MenuAction::OpenGame,
    },
    ButtonSpec {
        image: "4.png",
        rect: [0.26, 0.01, 0.74, 0.14],
        action: MenuAction::OpenChannel,
    },
    ButtonSpec {
        image: "5.png",
        rect: [0.26, 0.17, 0.74, 0.20],
        action: MenuAction::PlayMusic,
    },
    ButtonSpec {
        image: "6.png",
        rect: [0.00, 0.54, 0.70, 0.46],
        action: MenuAction::Configure,
    },
];

/// Whole-pixel `[x, y, w, h]` of a fractional rectangle inside `size`.
fn scaled_rect(rect: [f32; 4], size: [u32; 2]) -> [u32; 4] {
    let [rx, ry, rw, rh] = rect;
    let [w, h] = size.map(|v| v as f32);
    [rx * w, ry * h, rw * w, rh * h].map(|v| v.round().max(0.0) as u32)
}

/// Collapses bursts of resize events: the first change after a quiet period
/// fires at once, later ones fire `delay` after the burst ends.
pub struct ResizeDebounce {
    delay: Duration,
    last_fire: Option<Instant>,
    deadline: Option<Instant>,
}

impl ResizeDebounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_fire: None,
            deadline: None,
        }
    }

    /// Returns true when the pending change should be applied now.
    pub fn poll(&mut self, changed: bool, now: Instant) -> bool {
        if changed {
            let idle = self
                .last_fire
                .is_none_or(|last| now.duration_since(last) > self.delay);
            if idle {
                self.fire(now);
                return true;
            }
            self.deadline = Some(now + self.delay);
            return false;
        }
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.fire(now);
                true
            }
            _ => false,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn fire(&mut self, now: Instant) {
        self.last_fire = Some(now);
        self.deadline = None;
    }
}

struct PlacedButton {
    action: MenuAction,
    rect: egui::Rect,
    texture: Option<egui::TextureHandle>,
}

/// The six image buttons that make up the main window.
pub struct ButtonLayer {
    sources: Vec<Option<RgbaImage>>,
    layouts: BoundedCache<[u32; 2], Vec<PlacedButton>>,
    debounce: ResizeDebounce,
    seen_size: Option<[u32; 2]>,
    current: Option<[u32; 2]>,
}

impl ButtonLayer {
    pub fn load() -> Self {
        let sources = BUTTONS
            .iter()
            .map(|spec| {
                let path = env::resource_path(&format!("assets/{}", spec.image));
                match image::open(&path) {
                    Ok(image) => Some(image.to_rgba8()),
                    Err(err) => {
                        warn!("ui: {} unavailable, using a text button: {err}", path.display());
                        None
                    }
                }
            })
            .collect();
        Self {
            sources,
            layouts: BoundedCache::new(MAX_CACHED_LAYOUTS),
            debounce: ResizeDebounce::new(RESIZE_DEBOUNCE),
            seen_size: None,
            current: None,
        }
    }

    /// Draw the buttons over the whole of `ui` and return the one clicked.
    pub fn show(&mut self, ui: &mut egui::Ui, i18n: I18n) -> Option<MenuAction> {
        let area = ui.max_rect();
        let size = [area.width(), area.height()].map(|v| v.round().max(0.0) as u32);
        let now = Instant::now();

        let changed = self.seen_size != Some(size);
        self.seen_size = Some(size);
        if self.debounce.poll(changed, now) {
            self.current = Some(size);
        }
        if let Some(deadline) = self.debounce.deadline() {
            ui.ctx()
                .request_repaint_after(deadline.saturating_duration_since(now));
        }

        let size = self.current?;
        if !self.layouts.contains_key(&size) {
            let layout = self.build(ui.ctx(), size);
            self.layouts.insert(size, layout);
        }
        let layout = self.layouts.get(&size)?;

        let mut clicked = None;
        for button in layout {
            let rect = button.rect.translate(area.min.to_vec2());
            let response = match &button.texture {
                Some(texture) => ui.put(
                    rect,
                    egui::Button::image(egui::Image::new(texture).fit_to_exact_size(rect.size()))
                        .frame(false),
                ),
                None => ui.put(rect, egui::Button::new(i18n.menu_label(button.action))),
            };
            if response.clicked() {
                clicked = Some(button.action);
            }
        }
        clicked
    }

    fn build(&self, ctx: &egui::Context, size: [u32; 2]) -> Vec<PlacedButton> {
        debug!(
            "ui: laying out buttons for {}x{} ({} layouts cached)",
            size[0],
            size[1],
            self.layouts.len()
        );
        BUTTONS
            .iter()
            .zip(&self.sources)
            .enumerate()
            .map(|(index, (spec, source))| {
                let [x, y, w, h] = scaled_rect(spec.rect, size);
                let rect = egui::Rect::from_min_size(
                    egui::pos2(x as f32, y as f32),
                    egui::vec2(w as f32, h as f32),
                );
                let texture = source.as_ref().filter(|_| w > 0 && h > 0).map(|image| {
                    let resized = imageops::resize(image, w, h, FilterType::Lanczos3);
                    let color = egui::ColorImage::from_rgba_unmultiplied(
                        [w as usize, h as usize],
                        resized.as_raw(),
                    );
                    ctx.load_texture(
                        format!("menu-button-{index}-{w}x{h}"),
                        color,
                        egui::TextureOptions::LINEAR,
                    )
                });
                PlacedButton {
                    action: spec.action,
                    rect,
                    texture,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_fractional_rects() {
        assert_eq!(scaled_rect([0.5, 0.25, 0.25, 0.75], [800, 600]), [400, 150, 200, 450]);
        assert_eq!(scaled_rect([0.71, 0.38, 0.29, 0.62], [800, 600]), [568, 228, 232, 372]);
        assert_eq!(scaled_rect([0.0, 0.0, 0.5, 0.5], [0, 0]), [0, 0, 0, 0]);
    }

    #[test]
    fn first_resize_applies_immediately() {
        let mut debounce = ResizeDebounce::new(Duration::from_millis(150));
        assert!(debounce.poll(true, Instant::now()));
        assert!(debounce.deadline().is_none());
    }

    #[test]
    fn burst_of_resizes_settles_after_delay() {
        let start = Instant::now();
        let mut debounce = ResizeDebounce::new(Duration::from_millis(150));
        assert!(debounce.poll(true, start));

        let during = start + Duration::from_millis(40);
        assert!(!debounce.poll(true, during));
        assert!(!debounce.poll(false, during + Duration::from_millis(100)));
        assert!(debounce.poll(false, during + Duration::from_millis(150)));
        assert!(!debounce.poll(false, during + Duration::from_millis(400)));
    }

    #[test]
    fn every_menu_action_has_one_button() {
        for action in [
            MenuAction::Launch,
            MenuAction::Versions,
            MenuAction::OpenGame,
            MenuAction::OpenChannel,
            MenuAction::PlayMusic,
            MenuAction::Configure,
        ] {
            assert_eq!(BUTTONS.iter().filter(|b| b.action == action).count(), 1);
        }
    }
}
