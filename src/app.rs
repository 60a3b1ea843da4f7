use crate::api::{RecordApi, RecordClient};
use crate::commands::{self, Action};
use crate::config::Config;
use crate::push::{PushSource, SocketIoSource};
use crate::query::View;
use crate::render;
use crate::sync::SyncController;
use color_eyre::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// What was last printed, so output only appears when something changed
#[derive(Debug, Default, PartialEq, Eq)]
struct Printed {
  header: String,
  rows: String,
  footer: String,
  notice: Option<String>,
  error: Option<String>,
}

/// Main application state
pub struct App {
  controller: SyncController,

  /// Application configuration
  config: Config,

  printed: Printed,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let api: Arc<dyn RecordApi> = Arc::new(RecordClient::new(&config)?);
    let push: Option<Arc<dyn PushSource>> = if config.push.enabled {
      Some(Arc::new(SocketIoSource::new(&config.api.url, &config.push)?))
    } else {
      None
    };

    let controller = SyncController::new(api, push, config.sync.clone(), config.default_view);

    Ok(Self {
      controller,
      config,
      printed: Printed::default(),
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    info!(url = %self.config.api.url, view = %self.config.default_view, "starting");
    println!("cvsync connected to {} (type 'help' for commands)", self.config.api.url);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    self.controller.mount();

    while !self.should_quit {
      self.print_changes();

      tokio::select! {
        line = lines.next_line() => match line? {
          Some(line) => self.execute(&line),
          // stdin closed
          None => self.should_quit = true,
        },
        _ = self.controller.step() => {}
        _ = tokio::signal::ctrl_c() => self.should_quit = true,
      }
    }

    self.controller.teardown();
    Ok(())
  }

  fn execute(&mut self, line: &str) {
    let action = match commands::parse(line) {
      Ok(Some(action)) => action,
      Ok(None) => return,
      Err(e) => {
        println!("{}", e);
        return;
      }
    };

    self.controller.clear_error();
    match action {
      Action::View(view) => self.controller.set_view(view),
      Action::Search(text) => self.controller.set_search(&text),
      Action::MinScore(Some(score)) => self.controller.toggle_min_score(score),
      Action::MinScore(None) => self.controller.clear_min_score(),
      Action::Sort(field) => self.controller.toggle_sort(field),
      Action::Page(page) => self.controller.set_page(page),
      Action::Next => self.controller.next_page(),
      Action::Prev => self.controller.prev_page(),
      Action::Star(id) => {
        if !self.controller.toggle_starred(&id) {
          println!("no CV '{}' on this page", id);
        }
      }
      Action::Delete(id) => {
        if !self.controller.delete(&id) {
          println!("no CV '{}' on this page", id);
        }
      }
      Action::Bulk(ids) => self.controller.bulk_delete(ids),
      Action::Purge => self.controller.delete_all(),
      Action::Refresh => self.controller.refresh(),
      Action::Stats => self.print_stats(),
      Action::Rows => self.printed.rows.clear(),
      Action::Help => println!("{}", render::help()),
      Action::Quit => self.should_quit = true,
    }
  }

  fn print_stats(&self) {
    let view: View = self.controller.params().view();
    match self.controller.analytics() {
      Some(analytics) => println!("{}", render::analytics(view.label(), &analytics)),
      None => println!("{}: analytics not loaded yet", view.label()),
    }
  }

  fn print_changes(&mut self) {
    let now = chrono::Utc::now();
    let records = self.controller.records();
    let pagination = self.controller.pagination();
    let current = Printed {
      header: render::header(
        self.controller.params(),
        self.controller.state(),
        self.controller.has_pending_edits(),
        self.controller.is_push_connected(),
      ),
      rows: render::rows(&records, pagination.as_ref(), now),
      footer: pagination.as_ref().map(render::page_window).unwrap_or_default(),
      notice: self.controller.notice().map(str::to_string),
      error: self.controller.error().map(|e| e.to_string()),
    };

    if current.header != self.printed.header || current.rows != self.printed.rows {
      println!("\n{}", current.header);
      println!("{}", current.rows);
      if !current.footer.is_empty() {
        println!("{}", current.footer);
      }
    }
    if current.notice != self.printed.notice {
      if let Some(notice) = &current.notice {
        println!(">> {}", notice);
      }
    }
    if current.error != self.printed.error {
      if let Some(error) = &current.error {
        println!("!! {}", error);
      }
    }
    self.printed = current;
  }
}
