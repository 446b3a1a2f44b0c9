use std::collections::HashSet;
use std::time::Duration;

use eframe::{egui, Frame};
use egui::text::{CCursor, CCursorRange};
use egui::Context;

use reqwest::blocking::Client;
use reqwest::Result;

use rs_complete_core::model::SUGGESTION_LIMIT;
use rs_complete_core::session::{EditorSession, SuggestionMode, SuggestionState};

const SERVER: &str = "http://127.0.0.1:5000";

/// REST context holding a reusable blocking HTTP client.
struct RESTContext {
    client: Client,
}

impl RESTContext {
    /// Creates a new REST context with a timeout.
    fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::new(5, 0))
            .build()?;
        Ok(Self { client })
    }

    /// Sends a GET request to `/v1/suggest` for the text before `cursor`.
    fn get_suggest(&self, text: &str, cursor: usize) -> Result<SuggestionState> {
        let cursor = cursor.to_string();
        self.client
            .get(format!("{SERVER}/v1/suggest"))
            .query(&[("text", text), ("cursor", cursor.as_str())])
            .send()?
            .error_for_status()?
            .json()
    }

    /// Sends a GET request to `/v1/corpora`.
    fn get_corpora(&self) -> Result<String> {
        self.client
            .get(format!("{SERVER}/v1/corpora"))
            .send()?
            .error_for_status()?
            .text()
    }

    /// Sends a GET request to `/v1/loaded_corpora`.
    fn get_loaded_corpora(&self) -> Result<String> {
        self.client
            .get(format!("{SERVER}/v1/loaded_corpora"))
            .send()?
            .error_for_status()?
            .text()
    }

    /// Sends a PUT request to `/v1/load_corpora`.
    fn put_load_corpora(&self, names: &str) -> Result<String> {
        self.client
            .put(format!("{SERVER}/v1/load_corpora"))
            .query(&[("names", names)])
            .send()?
            .error_for_status()?
            .text()
    }
}

/// Splits a newline-separated server listing.
fn lines(body: &str) -> impl Iterator<Item = String> + '_ {
    body.lines().map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned)
}

/// Widget text plus the session mirroring it.
#[derive(Default)]
struct Buffer {
    /// Text bound to the widget.
    text: String,
    session: EditorSession,
    /// Cursor to push back into the widget on the next frame.
    pending_cursor: Option<usize>,
}

impl Buffer {
    /// Copies the widget text and cursor into the session.
    ///
    /// Without a cursor (widget never focused) the previous one is kept.
    /// Returns true when the text or the cursor changed.
    fn sync(&mut self, cursor: Option<usize>) -> bool {
        let cursor = cursor.unwrap_or(self.session.cursor());
        if self.text == self.session.text() && cursor == self.session.cursor() {
            return false;
        }
        self.session.set_text(self.text.clone(), cursor);
        true
    }

    /// Applies a suggestion at the session cursor.
    fn accept(&mut self, word: &str) {
        self.session.accept(word);
        self.commit();
    }

    /// Inserts text at the session cursor.
    fn insert(&mut self, s: &str) {
        self.session.insert(s);
        self.commit();
    }

    fn commit(&mut self) {
        self.text = self.session.text().to_owned();
        self.pending_cursor = Some(self.session.cursor());
    }
}

/// Global UI state (MUST persist between frames in egui).
struct EditorUI {
    rest: RESTContext,
    buffer: Buffer,
    state: Option<SuggestionState>,
    status: Option<String>,

    available_corpora: Vec<String>,
    selected_corpora: HashSet<String>,
}

impl EditorUI {
    /// Initializes the UI and fetches the corpus lists.
    fn new() -> Result<Self> {
        let mut editor = Self {
            rest: RESTContext::new()?,
            buffer: Buffer::default(),
            state: None,
            status: None,

            available_corpora: Vec::new(),
            selected_corpora: HashSet::new(),
        };
        editor.get_corpora();
        editor.refresh();
        Ok(editor)
    }

    /// Asks for suggestions at the session cursor.
    fn refresh(&mut self) {
        let session = &self.buffer.session;
        match self.rest.get_suggest(session.text(), session.cursor()) {
            Ok(state) => {
                self.state = Some(state);
                self.status = None;
            }
            Err(e) => {
                self.state = None;
                self.status = Some(format!("Error: {e}"));
            }
        }
    }

    /// Applies a suggestion button.
    fn accept(&mut self, word: &str) {
        self.buffer.accept(word);
        self.refresh();
    }

    /// Inserts the ghost completion at the cursor, if any.
    fn accept_ghost(&mut self) {
        let ghost = self.state.as_ref().and_then(|s| s.ghost.clone());
        if let Some(ghost) = ghost {
            self.buffer.insert(&ghost);
            self.refresh();
        }
    }

    /// Performs the get corpora requests.
    fn get_corpora(&mut self) {
        match self.rest.get_corpora() {
            Ok(body) => self.available_corpora = lines(&body).collect(),
            Err(e) => self.status = Some(format!("Error: {e}")),
        }
        match self.rest.get_loaded_corpora() {
            Ok(body) => self.selected_corpora = lines(&body).collect(),
            Err(e) => self.status = Some(format!("Error: {e}")),
        }
    }

    /// Performs the load corpora request.
    fn put_load_corpora(&mut self) {
        let mut names = self.selected_corpora.iter().cloned().collect::<Vec<_>>();
        names.sort();
        match self.rest.put_load_corpora(&names.join(",")) {
            Ok(body) => self.status = Some(body),
            Err(e) => self.status = Some(format!("Error: {e}")),
        }
        self.refresh();
    }
}

impl eframe::App for EditorUI {
    /// UI update loop (called every frame).
    fn update(&mut self, ctx: &Context, _: &mut Frame) {
        if ctx.input_mut(|i| i.consume_key(egui::Modifiers::CTRL, egui::Key::Space)) {
            self.accept_ghost();
        }

        let mut clicked: Option<String> = None;
        egui::TopBottomPanel::top("suggestions").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let suggestions = self.state.as_ref().map(|s| s.suggestions.as_slice()).unwrap_or_default();
                for i in 0..SUGGESTION_LIMIT {
                    let label = suggestions.get(i).map(|s| s.text.as_str()).unwrap_or_default();
                    if ui.add_sized([140.0, 30.0], egui::Button::new(label)).clicked() && !label.is_empty() {
                        clicked = Some(label.to_owned());
                    }
                }
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            let mut selection_changed = false;
            ui.horizontal_wrapped(|ui| {
                for corpus in &self.available_corpora {
                    let mut checked = self.selected_corpora.contains(corpus);
                    if ui.checkbox(&mut checked, corpus).changed() {
                        if checked {
                            selection_changed = true;
                            self.selected_corpora.insert(corpus.clone());
                        } else if self.selected_corpora.len() > 1 {
                            selection_changed = true;
                            self.selected_corpora.remove(corpus);
                        }
                    }
                }
            });
            if selection_changed {
                self.put_load_corpora();
            }

            match (&self.status, self.state.as_ref().and_then(|s| s.ghost.as_ref())) {
                (Some(status), _) => ui.label(status),
                (None, Some(ghost)) => ui.weak(format!("Ctrl+Space completes: …{ghost}")),
                (None, None) => ui.weak("Type to get suggestions"),
            };
        });

        let mut moved = false;
        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(SuggestionState { mode: SuggestionMode::Completion { partial }, .. }) = &self.state {
                ui.weak(format!("Completing \"{partial}\""));
            }
            let mut output = egui::TextEdit::multiline(&mut self.buffer.text)
                .hint_text("Start typing…")
                .desired_width(f32::INFINITY)
                .min_size(ui.available_size())
                .show(ui);

            if let Some(cursor) = self.buffer.pending_cursor.take() {
                let range = CCursorRange::one(CCursor::new(cursor));
                output.state.cursor.set_char_range(Some(range));
                output.state.clone().store(ui.ctx(), output.response.id);
                output.response.request_focus();
            }

            let cursor = output.state.cursor.char_range().map(|range| range.primary.index);
            moved = self.buffer.sync(cursor);
        });
        if moved {
            self.refresh();
        }

        if let Some(word) = clicked {
            self.accept(&word);
        }
    }
}

/// Application entry point.
fn main() -> eframe::Result {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([640.0, 420.0])
            .with_resizable(true),
        ..Default::default()
    };

    eframe::run_native(
        "rs-complete",
        options,
        Box::new(|_| Ok(Box::new(EditorUI::new()?))),
    )
}
