use super::{ActivityDriver, DisplayBounds, DriverError};
use core_graphics::display::CGDisplay;
use core_graphics::event::{CGEvent, CGEventTapLocation, CGEventType, CGKeyCode, CGMouseButton};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use core_graphics::geometry::CGPoint;

/// kVK_F15: present on no modern keyboard, ignored by every app, but still
/// counts as user activity to the window server.
const NULL_KEYCODE: CGKeyCode = 113;

pub struct MacOSDriver;

impl MacOSDriver {
    pub fn new() -> Result<Self, DriverError> {
        Ok(Self)
    }
}

fn hid_source() -> Result<CGEventSource, DriverError> {
    CGEventSource::new(CGEventSourceStateID::HIDSystemState)
        .map_err(|_| DriverError::Post("could not create HID event source".to_string()))
}

fn bounds_of(display: &CGDisplay) -> DisplayBounds {
    let rect = display.bounds();
    DisplayBounds {
        x: rect.origin.x as i32,
        y: rect.origin.y as i32,
        width: rect.size.width as i32,
        height: rect.size.height as i32,
    }
}

/// Bounds of the display the cursor is on, falling back to the main display
/// when no active display contains the point.
fn display_bounds_at(x: i32, y: i32) -> DisplayBounds {
    if let Ok(ids) = CGDisplay::active_displays() {
        for id in ids {
            let bounds = bounds_of(&CGDisplay::new(id));
            if bounds.contains(x, y) {
                return bounds;
            }
        }
    }
    bounds_of(&CGDisplay::main())
}

impl ActivityDriver for MacOSDriver {
    fn cursor_position(&self) -> Result<(i32, i32), DriverError> {
        let event = CGEvent::new(hid_source()?)
            .map_err(|_| DriverError::Post("could not query cursor location".to_string()))?;
        let location = event.location();
        Ok((location.x as i32, location.y as i32))
    }

    fn move_relative(&mut self, dx: i32, dy: i32) -> Result<(), DriverError> {
        let (x, y) = self.cursor_position()?;
        let bounds = display_bounds_at(x, y);
        let (tx, ty) = bounds.clamp(x + dx, y + dy);

        let event = CGEvent::new_mouse_event(
            hid_source()?,
            CGEventType::MouseMoved,
            CGPoint::new(tx as f64, ty as f64),
            CGMouseButton::Left,
        )
        .map_err(|_| DriverError::Post("could not create mouse-moved event".to_string()))?;
        event.post(CGEventTapLocation::HID);
        Ok(())
    }

    fn null_click(&mut self) -> Result<(), DriverError> {
        for keydown in [true, false] {
            let event = CGEvent::new_keyboard_event(hid_source()?, NULL_KEYCODE, keydown)
                .map_err(|_| DriverError::Post("could not create keyboard event".to_string()))?;
            event.post(CGEventTapLocation::HID);
        }
        Ok(())
    }
}
