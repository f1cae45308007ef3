mod app;
mod config;
mod crypto;
mod feedback;
mod form;
mod models;
mod page;
mod storage;
mod table;
mod ui;

fn main() {
    if let Err(e) = app::run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
