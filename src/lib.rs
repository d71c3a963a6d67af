mod commands;
pub mod inhibitor;
pub mod platform;
pub mod scheduler;
pub mod settings;

use crate::inhibitor::Inhibitor;
use crate::platform::NativeDriver;
use crate::scheduler::{JiggleScheduler, Status};
use crate::settings::{Settings, INHIBIT_LABEL, INHIBIT_RANGE, INTERVALS, MOVE_RANGES};
use clap::Parser;
use log::warn;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tauri::menu::{
    CheckMenuItem, IsMenuItem, Menu, MenuEvent, MenuItem, PredefinedMenuItem, Submenu,
};
use tauri::tray::TrayIconBuilder;
use tauri::{AppHandle, Manager, Wry};

pub type SharedScheduler = Arc<Mutex<JiggleScheduler<NativeDriver>>>;

/// Cadence of the ticker thread that drives the scheduler and countdown.
const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(name = "fidget", about = "Prevent screen sleep by jiggling the mouse.")]
struct Args {
    /// Seconds between activity signals
    #[arg(long, default_value_t = 240, value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,

    /// Maximum pixels to move per jiggle (0 selects the sleep inhibitor)
    #[arg(long, default_value_t = 5)]
    distance: u32,

    /// Use mouse movement even where a sleep inhibitor is available
    #[arg(long)]
    force_mouse: bool,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

/// Handles to the tray menu items that re-render as state changes.
struct TrayMenu {
    status: MenuItem<Wry>,
    start: MenuItem<Wry>,
    stop: MenuItem<Wry>,
    intervals: Vec<(u64, CheckMenuItem<Wry>)>,
    ranges: Vec<(u32, CheckMenuItem<Wry>)>,
}

/// Signals the ticker thread to exit.
struct ShutdownFlag(Arc<AtomicBool>);

/// Holds the ticker thread handle for graceful shutdown.
struct TickerHandle(Mutex<Option<JoinHandle<()>>>);

pub(crate) fn lock_scheduler(
    scheduler: &SharedScheduler,
) -> MutexGuard<'_, JiggleScheduler<NativeDriver>> {
    match scheduler.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("scheduler mutex was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

fn status_label(status: &Status) -> String {
    if status.running {
        format!(
            "Fidget in: {}",
            settings::format_remaining(status.seconds_remaining)
        )
    } else {
        "Idle".to_string()
    }
}

fn sync_menu(menu: &TrayMenu, status: &Status) -> tauri::Result<()> {
    menu.status.set_text(status_label(status))?;
    menu.start.set_enabled(!status.running)?;
    menu.stop.set_enabled(status.running)?;
    for (secs, item) in &menu.intervals {
        item.set_checked(*secs == status.interval_secs)?;
    }
    for (px, item) in &menu.ranges {
        item.set_checked(*px == status.range_px)?;
    }
    Ok(())
}

/// Re-render the whole menu from the current scheduler state.
pub(crate) fn sync_tray(app: &AppHandle) {
    let Some(scheduler) = app.try_state::<SharedScheduler>() else {
        return;
    };
    let status = lock_scheduler(&scheduler).status();
    if let Some(menu) = app.try_state::<TrayMenu>() {
        if let Err(e) = sync_menu(&menu, &status) {
            warn!("failed to update tray menu: {}", e);
        }
    }
}

fn handle_menu_event(app: &AppHandle, event: MenuEvent) {
    let Some(scheduler) = app.try_state::<SharedScheduler>() else {
        return;
    };

    match event.id.as_ref() {
        "start" => lock_scheduler(&scheduler).start(),
        "stop" => lock_scheduler(&scheduler).stop(),
        "quit" => {
            shutdown(app);
            return;
        }
        other => {
            if let Some(secs) = other
                .strip_prefix("interval:")
                .and_then(|v| v.parse::<u64>().ok())
            {
                if settings::is_supported_interval(secs) {
                    lock_scheduler(&scheduler).set_interval(secs);
                } else {
                    warn!("ignoring unsupported interval: {}s", secs);
                    return;
                }
            } else if let Some(px) = other
                .strip_prefix("range:")
                .and_then(|v| v.parse::<u32>().ok())
            {
                let mut guard = lock_scheduler(&scheduler);
                if settings::is_supported_range(px, guard.inhibitor_available()) {
                    guard.set_range(px);
                } else {
                    warn!("ignoring unsupported range: {}px", px);
                    return;
                }
            } else {
                return;
            }
        }
    }

    sync_tray(app);
}

/// Stop jiggling, wind down the ticker thread and exit.
fn shutdown(app: &AppHandle) {
    if let Some(scheduler) = app.try_state::<SharedScheduler>() {
        lock_scheduler(&scheduler).stop();
    }
    if let Some(flag) = app.try_state::<ShutdownFlag>() {
        flag.0.store(true, Ordering::SeqCst);
    }
    if let Some(handle_state) = app.try_state::<TickerHandle>() {
        if let Ok(mut guard) = handle_state.0.lock() {
            if let Some(handle) = guard.take() {
                let _ = handle.join();
            }
        }
    }
    app.exit(0);
}

fn setup_tray(app: &tauri::App, status: &Status, inhibitor_available: bool) -> tauri::Result<()> {
    let status_item = MenuItem::with_id(app, "status", status_label(status), false, None::<&str>)?;
    let start = MenuItem::with_id(app, "start", "Start Fidget", !status.running, None::<&str>)?;
    let stop = MenuItem::with_id(app, "stop", "Stop Fidget", status.running, None::<&str>)?;

    let mut intervals = Vec::new();
    for (label, secs) in INTERVALS {
        let item = CheckMenuItem::with_id(
            app,
            format!("interval:{}", secs),
            *label,
            true,
            *secs == status.interval_secs,
            None::<&str>,
        )?;
        intervals.push((*secs, item));
    }
    let interval_refs: Vec<&dyn IsMenuItem<Wry>> = intervals
        .iter()
        .map(|(_, item)| item as &dyn IsMenuItem<Wry>)
        .collect();
    let tempo_menu = Submenu::with_items(app, "Tempo", true, &interval_refs)?;

    let mut ranges = Vec::new();
    if inhibitor_available {
        let item = CheckMenuItem::with_id(
            app,
            format!("range:{}", INHIBIT_RANGE),
            INHIBIT_LABEL,
            true,
            status.range_px == INHIBIT_RANGE,
            None::<&str>,
        )?;
        ranges.push((INHIBIT_RANGE, item));
    }
    for (label, px) in MOVE_RANGES {
        let item = CheckMenuItem::with_id(
            app,
            format!("range:{}", px),
            *label,
            true,
            *px == status.range_px,
            None::<&str>,
        )?;
        ranges.push((*px, item));
    }
    let range_refs: Vec<&dyn IsMenuItem<Wry>> = ranges
        .iter()
        .map(|(_, item)| item as &dyn IsMenuItem<Wry>)
        .collect();
    let range_menu = Submenu::with_items(app, "Range", true, &range_refs)?;

    let quit = MenuItem::with_id(app, "quit", "Quit Fidget", true, None::<&str>)?;
    let menu = Menu::with_items(
        app,
        &[
            &status_item,
            &start,
            &stop,
            &PredefinedMenuItem::separator(app)?,
            &tempo_menu,
            &range_menu,
            &PredefinedMenuItem::separator(app)?,
            &quit,
        ],
    )?;

    TrayIconBuilder::new()
        .menu(&menu)
        .tooltip("Fidget")
        .on_menu_event(handle_menu_event)
        .build(app)?;

    app.manage(TrayMenu {
        status: status_item,
        start,
        stop,
        intervals,
        ranges,
    });
    Ok(())
}

/// One cooperative loop: drive `tick()` and refresh the countdown text once
/// per second until the shutdown flag is raised.
fn spawn_ticker(
    app: AppHandle,
    scheduler: SharedScheduler,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while !shutdown.load(Ordering::SeqCst) {
            let status = {
                let mut guard = lock_scheduler(&scheduler);
                guard.tick();
                guard.status()
            };

            let handle = app.clone();
            let _ = app.run_on_main_thread(move || {
                if let Some(menu) = handle.try_state::<TrayMenu>() {
                    if let Err(e) = menu.status.set_text(status_label(&status)) {
                        warn!("failed to update countdown: {}", e);
                    }
                }
            });

            thread::sleep(TICK_PERIOD);
        }
    })
}

fn init_logging(verbose: bool) {
    let level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let args = Args::parse();
    init_logging(args.verbose);

    tauri::Builder::default()
        .setup(move |app| {
            let driver = NativeDriver::new().expect("Failed to initialize the input driver");
            let settings = Settings {
                interval_secs: args.interval,
                range_px: args.distance,
            };
            let scheduler: SharedScheduler = Arc::new(Mutex::new(JiggleScheduler::new(
                driver,
                Inhibitor::native(),
                settings,
                args.force_mouse,
            )));

            // Start jiggling by default.
            lock_scheduler(&scheduler).start();

            let (status, inhibitor_available) = {
                let guard = lock_scheduler(&scheduler);
                (guard.status(), guard.inhibitor_available())
            };
            setup_tray(app, &status, inhibitor_available)?;

            let shutdown = Arc::new(AtomicBool::new(false));
            let handle = spawn_ticker(
                app.handle().clone(),
                Arc::clone(&scheduler),
                Arc::clone(&shutdown),
            );

            app.manage(scheduler);
            app.manage(ShutdownFlag(shutdown));
            app.manage(TickerHandle(Mutex::new(Some(handle))));

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::get_status,
            commands::start_jiggling,
            commands::stop_jiggling
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
