use super::{ActivityDriver, DisplayBounds, DriverError};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt as _, Window, KEY_PRESS_EVENT, KEY_RELEASE_EVENT};
use x11rb::protocol::xtest::ConnectionExt as _;
use x11rb::rust_connection::RustConnection;

/// XK_F15. Delivered as a fake key press/release pair; harmless to every
/// application but resets the server idle counter.
const NULL_KEYSYM: u32 = 0xffcc;

pub struct LinuxDriver {
    conn: RustConnection,
    root: Window,
    null_keycode: Option<u8>,
}

impl LinuxDriver {
    pub fn new() -> Result<Self, DriverError> {
        let (conn, screen_num) =
            x11rb::connect(None).map_err(|e| DriverError::Connect(e.to_string()))?;
        let root = conn.setup().roots[screen_num].root;

        let null_keycode = find_keycode(&conn, NULL_KEYSYM);
        if null_keycode.is_none() {
            log::debug!("no keycode mapped to F15, null clicks unavailable");
        }

        Ok(Self {
            conn,
            root,
            null_keycode,
        })
    }

    /// Root geometry, queried per call so resolution changes are picked up.
    /// On X11 the root window spans the combined desktop.
    fn root_bounds(&self) -> Result<DisplayBounds, DriverError> {
        let geometry = self
            .conn
            .get_geometry(self.root)
            .map_err(|e| DriverError::Post(e.to_string()))?
            .reply()
            .map_err(|e| DriverError::Post(e.to_string()))?;

        Ok(DisplayBounds {
            x: 0,
            y: 0,
            width: i32::from(geometry.width),
            height: i32::from(geometry.height),
        })
    }
}

fn find_keycode(conn: &RustConnection, keysym: u32) -> Option<u8> {
    let setup = conn.setup();
    let min = setup.min_keycode;
    let count = setup.max_keycode - min + 1;

    let mapping = conn.get_keyboard_mapping(min, count).ok()?.reply().ok()?;
    let per = usize::from(mapping.keysyms_per_keycode);
    if per == 0 {
        return None;
    }

    mapping
        .keysyms
        .chunks(per)
        .position(|syms| syms.contains(&keysym))
        .map(|index| min + index as u8)
}

impl ActivityDriver for LinuxDriver {
    fn cursor_position(&self) -> Result<(i32, i32), DriverError> {
        let pointer = self
            .conn
            .query_pointer(self.root)
            .map_err(|e| DriverError::Post(e.to_string()))?
            .reply()
            .map_err(|e| DriverError::Post(e.to_string()))?;

        Ok((i32::from(pointer.root_x), i32::from(pointer.root_y)))
    }

    fn move_relative(&mut self, dx: i32, dy: i32) -> Result<(), DriverError> {
        let (x, y) = self.cursor_position()?;
        let bounds = self.root_bounds()?;
        let (tx, ty) = bounds.clamp(x + dx, y + dy);

        self.conn
            .warp_pointer(x11rb::NONE, self.root, 0, 0, 0, 0, tx as i16, ty as i16)
            .map_err(|e| DriverError::Post(e.to_string()))?
            .check()
            .map_err(|e| DriverError::Post(e.to_string()))?;
        Ok(())
    }

    fn null_click(&mut self) -> Result<(), DriverError> {
        let keycode = self.null_keycode.ok_or(DriverError::Unsupported)?;

        for kind in [KEY_PRESS_EVENT, KEY_RELEASE_EVENT] {
            self.conn
                .xtest_fake_input(kind, keycode, x11rb::CURRENT_TIME, self.root, 0, 0, 0)
                .map_err(|e| DriverError::Post(e.to_string()))?
                .check()
                .map_err(|e| DriverError::Post(e.to_string()))?;
        }
        Ok(())
    }
}
