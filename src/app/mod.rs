//! The studio surface: one event loop owning both chat panels, the
//! viewport, the workbench, and the settings overlay.
//!
//! Generation rounds run on spawned tasks and report back over an
//! unbounded channel; the loop folds each update into [`Studio`] and
//! redraws. Nothing outside this module touches the terminal.

use crate::api;
use crate::api::provider::GenerationProvider;
use crate::config::{Config, ProviderKind, Settings};
use crate::state::studio::{Studio, StudioEffect, StudioUpdate};
use crate::terminal::TerminalType;
use crate::ui::editor::{InputAction, InputEditor};
use crate::ui::layout::{
    split_studio_layout, ASSET_PANEL_WIDTH, CODE_PANEL_WIDTH,
};
use crate::ui::render::{self, WorkbenchTab, SETTINGS_ROWS};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const TUI_TICK_INTERVAL: Duration = Duration::from_millis(120);
const CHAT_SCROLL_STEP: usize = 3;
const MAX_INPUT_ROWS: u16 = 6;

/// Script shown in the workbench before the first extraction lands.
pub const DEFAULT_CODE: &str = r#"import { Engine, Scene, Vector3 } from 'game-engine';

class PlayerController extends Component {
  speed: number = 10;

  start() {
    console.log("Player Initialized");
  }

  update(deltaTime: number) {
    // Basic movement logic
    const input = Input.getAxis("Horizontal");
    this.transform.position.x += input * this.speed * deltaTime;
  }
}
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PanelFocus {
    AssetInput,
    CodeInput,
}

struct SettingsOverlay {
    draft: Settings,
    cursor: usize,
}

pub struct StudioApp {
    config: Config,
    studio: Studio,
    code_provider: Arc<dyn GenerationProvider>,
    asset_provider: Arc<dyn GenerationProvider>,
    update_tx: mpsc::UnboundedSender<StudioUpdate>,
    update_rx: mpsc::UnboundedReceiver<StudioUpdate>,
    terminal: Option<TerminalType>,
    code_input: InputEditor,
    asset_input: InputEditor,
    focus: PanelFocus,
    active_tab: WorkbenchTab,
    editor_text: String,
    editor_scroll: u16,
    viewport_playing: bool,
    asset_scroll_back: usize,
    code_scroll_back: usize,
    settings_overlay: Option<SettingsOverlay>,
    should_quit: bool,
}

impl StudioApp {
    pub fn new(config: Config) -> Result<Self> {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        let settings = config.initial_settings();
        let code_provider = api::build_provider(settings.code.kind, &config)?;
        let asset_provider = api::build_provider(settings.asset.kind, &config)?;
        let studio = Studio::new(settings);

        let terminal = if io::stdin().is_terminal() && io::stdout().is_terminal() {
            Some(crate::terminal::setup()?)
        } else {
            None
        };

        Ok(Self {
            config,
            studio,
            code_provider,
            asset_provider,
            update_tx,
            update_rx,
            terminal,
            code_input: InputEditor::new(),
            asset_input: InputEditor::new(),
            focus: PanelFocus::CodeInput,
            active_tab: WorkbenchTab::Code,
            editor_text: DEFAULT_CODE.to_string(),
            editor_scroll: 0,
            viewport_playing: false,
            asset_scroll_back: 0,
            code_scroll_back: 0,
            settings_overlay: None,
            should_quit: false,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        if self.terminal.is_none() {
            anyhow::bail!("gamegen needs an interactive terminal on stdin and stdout");
        }

        let result = self.run_loop().await;
        crate::terminal::restore()?;
        result
    }

    async fn run_loop(&mut self) -> Result<()> {
        let mut tick = tokio::time::interval(TUI_TICK_INTERVAL);
        while !self.should_quit {
            self.draw_frame()?;
            self.process_events()?;
            self.drain_updates_nonblocking();

            tokio::select! {
                _ = tick.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    self.should_quit = true;
                }
                update = self.update_rx.recv() => {
                    if let Some(update) = update {
                        self.handle_update(update);
                    }
                }
            }
        }

        Ok(())
    }

    fn draw_frame(&mut self) -> Result<()> {
        let status_line = self.status_line_text();
        let provider_note = self.header_note();
        let asset_turns = self.studio.asset.turns().to_vec();
        let code_turns = self.studio.code.turns().to_vec();
        let records = self.studio.assets.records().to_vec();
        let asset_input = self.asset_input.buffer().to_string();
        let asset_cursor = self.asset_input.cursor();
        let code_input = self.code_input.buffer().to_string();
        let code_cursor = self.code_input.cursor();
        let editor_text = self.editor_text.clone();
        let editor_scroll = self.editor_scroll;
        let active_tab = self.active_tab;
        let playing = self.viewport_playing;
        let asset_scroll_back = self.asset_scroll_back;
        let code_scroll_back = self.code_scroll_back;
        let focus = self.focus;
        let overlay = self
            .settings_overlay
            .as_ref()
            .map(|overlay| (overlay.draft.clone(), overlay.cursor));

        let Some(terminal) = self.terminal.as_mut() else {
            return Ok(());
        };

        terminal.draw(|frame| {
            let size = frame.area();
            let asset_rows = render::input_visual_rows(
                &asset_input,
                ASSET_PANEL_WIDTH.saturating_sub(2).max(1) as usize,
            ) as u16;
            let code_rows = render::input_visual_rows(
                &code_input,
                CODE_PANEL_WIDTH.saturating_sub(2).max(1) as usize,
            ) as u16;
            let layout = split_studio_layout(
                size,
                asset_rows.clamp(1, MAX_INPUT_ROWS),
                code_rows.clamp(1, MAX_INPUT_ROWS),
            );

            render::render_header(frame, layout.header, &provider_note);
            render::render_chat_panel(
                frame,
                layout.asset_chat,
                "Asset Architect",
                &asset_turns,
                asset_scroll_back,
            );
            render::render_chat_input(
                frame,
                layout.asset_input,
                &asset_input,
                asset_cursor,
                focus == PanelFocus::AssetInput && overlay.is_none(),
            );
            render::render_viewport(frame, layout.viewport, playing);
            render::render_workbench(
                frame,
                layout.workbench,
                active_tab,
                &editor_text,
                editor_scroll,
                &records,
            );
            render::render_chat_panel(
                frame,
                layout.code_chat,
                "Code Assistant",
                &code_turns,
                code_scroll_back,
            );
            render::render_chat_input(
                frame,
                layout.code_input,
                &code_input,
                code_cursor,
                focus == PanelFocus::CodeInput && overlay.is_none(),
            );
            render::render_status_line(frame, layout.status, &status_line);

            if let Some((draft, cursor)) = &overlay {
                render::render_settings_modal(frame, draft, *cursor);
            }
        })?;

        Ok(())
    }

    fn process_events(&mut self) -> Result<()> {
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Paste(text) => {
                    if self.settings_overlay.is_none() && !text.is_empty() {
                        self.focused_input_mut().insert_str(&text);
                    }
                }
                Event::Key(key)
                    if key.kind == KeyEventKind::Press || key.kind == KeyEventKind::Repeat =>
                {
                    self.handle_key_event(key)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        if self.settings_overlay.is_some() {
            self.handle_settings_key(key)?;
            return Ok(());
        }

        match key.code {
            KeyCode::F(2) => {
                self.settings_overlay = Some(SettingsOverlay {
                    draft: self.studio.settings.clone(),
                    cursor: 0,
                });
                return Ok(());
            }
            KeyCode::F(5) => {
                self.viewport_playing = !self.viewport_playing;
                return Ok(());
            }
            KeyCode::Tab => {
                self.focus = match self.focus {
                    PanelFocus::AssetInput => PanelFocus::CodeInput,
                    PanelFocus::CodeInput => PanelFocus::AssetInput,
                };
                return Ok(());
            }
            KeyCode::Char('e') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.active_tab = match self.active_tab {
                    WorkbenchTab::Code => WorkbenchTab::Assets,
                    WorkbenchTab::Assets => WorkbenchTab::Code,
                };
                return Ok(());
            }
            KeyCode::Up if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.editor_scroll = self.editor_scroll.saturating_sub(1);
                return Ok(());
            }
            KeyCode::Down if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let last_line = self.editor_text.lines().count().saturating_sub(1) as u16;
                self.editor_scroll = self.editor_scroll.saturating_add(1).min(last_line);
                return Ok(());
            }
            KeyCode::PageUp => {
                *self.focused_scroll_back_mut() += CHAT_SCROLL_STEP;
                return Ok(());
            }
            KeyCode::PageDown => {
                let scroll_back = self.focused_scroll_back_mut();
                *scroll_back = scroll_back.saturating_sub(CHAT_SCROLL_STEP);
                return Ok(());
            }
            KeyCode::Esc => {
                if !self.focused_input_mut().is_empty() {
                    self.focused_input_mut().clear();
                }
                return Ok(());
            }
            // A busy panel refuses the submit but keeps the draft intact.
            KeyCode::Enter if !key.modifiers.contains(KeyModifiers::SHIFT) => {
                let busy = match self.focus {
                    PanelFocus::AssetInput => self.studio.asset.is_busy(),
                    PanelFocus::CodeInput => self.studio.code.is_busy(),
                };
                if busy {
                    return Ok(());
                }
            }
            _ => {}
        }

        let focus = self.focus;
        match self.focused_input_mut().apply_key(key) {
            InputAction::None => {}
            InputAction::Submit(text) => match focus {
                PanelFocus::AssetInput => self.submit_asset_message(&text),
                PanelFocus::CodeInput => self.submit_code_message(&text),
            },
            InputAction::Interrupt | InputAction::Quit => {
                self.should_quit = true;
            }
        }

        Ok(())
    }

    fn handle_settings_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(overlay) = self.settings_overlay.as_mut() else {
            return Ok(());
        };

        match key.code {
            KeyCode::Esc => {
                self.settings_overlay = None;
            }
            KeyCode::Enter => {
                let draft = self.settings_overlay.take().map(|overlay| overlay.draft);
                if let Some(draft) = draft {
                    self.apply_settings(draft)?;
                }
            }
            KeyCode::Up => {
                overlay.cursor = overlay.cursor.saturating_sub(1);
            }
            KeyCode::Down => {
                overlay.cursor = (overlay.cursor + 1).min(SETTINGS_ROWS - 1);
            }
            KeyCode::Left => {
                if let Some(provider) = provider_row_mut(&mut overlay.draft, overlay.cursor) {
                    let kind = cycled_kind(provider.kind, -1);
                    provider.switch_kind(kind);
                }
            }
            KeyCode::Right => {
                if let Some(provider) = provider_row_mut(&mut overlay.draft, overlay.cursor) {
                    let kind = cycled_kind(provider.kind, 1);
                    provider.switch_kind(kind);
                }
            }
            KeyCode::Backspace => {
                if let Some(field) = text_row_mut(&mut overlay.draft, overlay.cursor) {
                    field.pop();
                }
            }
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let Some(field) = text_row_mut(&mut overlay.draft, overlay.cursor) {
                    field.push(ch);
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Commit an overlay draft: swap in the settings and rebuild both
    /// provider backends so the next round uses them.
    fn apply_settings(&mut self, draft: Settings) -> Result<()> {
        self.code_provider = api::build_provider(draft.code.kind, &self.config)?;
        self.asset_provider = api::build_provider(draft.asset.kind, &self.config)?;
        self.studio.settings = draft;
        Ok(())
    }

    fn submit_code_message(&mut self, text: &str) {
        let started = self.studio.start_code_round(
            Arc::clone(&self.code_provider),
            text,
            &self.editor_text,
            &self.update_tx,
        );
        if started {
            self.code_scroll_back = 0;
        }
    }

    fn submit_asset_message(&mut self, text: &str) {
        let started = self.studio.start_asset_round(
            Arc::clone(&self.asset_provider),
            text,
            &self.update_tx,
        );
        if started {
            self.asset_scroll_back = 0;
        }
    }

    fn handle_update(&mut self, update: StudioUpdate) {
        match self.studio.apply_update(update) {
            Some(StudioEffect::ShowExtractedCode(code)) => {
                self.editor_text = code;
                self.editor_scroll = 0;
                self.active_tab = WorkbenchTab::Code;
            }
            Some(StudioEffect::ShowAssetLibrary) => {
                self.active_tab = WorkbenchTab::Assets;
            }
            None => {}
        }
    }

    fn drain_updates_nonblocking(&mut self) {
        while let Ok(update) = self.update_rx.try_recv() {
            self.handle_update(update);
        }
    }

    fn focused_input_mut(&mut self) -> &mut InputEditor {
        match self.focus {
            PanelFocus::AssetInput => &mut self.asset_input,
            PanelFocus::CodeInput => &mut self.code_input,
        }
    }

    fn focused_scroll_back_mut(&mut self) -> &mut usize {
        match self.focus {
            PanelFocus::AssetInput => &mut self.asset_scroll_back,
            PanelFocus::CodeInput => &mut self.code_scroll_back,
        }
    }

    fn header_note(&self) -> String {
        format!(
            "code: {} {}   assets: {} {}",
            self.studio.settings.code.kind.label(),
            self.studio.settings.code.model,
            self.studio.settings.asset.kind.label(),
            self.studio.settings.asset.model,
        )
    }

    fn status_line_text(&self) -> String {
        let code = if self.studio.code.is_busy() {
            "code:streaming"
        } else {
            "code:idle"
        };
        let asset = if self.studio.asset.is_busy() {
            "asset:working"
        } else {
            "asset:idle"
        };
        let assets = format!("assets:{}", self.studio.assets.len());
        let focus = match self.focus {
            PanelFocus::AssetInput => "focus:asset",
            PanelFocus::CodeInput => "focus:code",
        };
        format!(
            "{code} | {asset} | {assets} | {focus} | tab:panel | f2:settings | f5:play | ctrl+e:workbench"
        )
    }
}

fn provider_row_mut(draft: &mut Settings, cursor: usize) -> Option<&mut crate::config::ProviderConfig> {
    match cursor {
        0 => Some(&mut draft.code),
        3 => Some(&mut draft.asset),
        _ => None,
    }
}

/// Editable text field behind a cursor row, if that row has one. The
/// credential row only accepts edits for providers that take a key.
fn text_row_mut(draft: &mut Settings, cursor: usize) -> Option<&mut String> {
    match cursor {
        1 => Some(&mut draft.code.model),
        4 => Some(&mut draft.asset.model),
        2 if draft.code.credential_editable() => {
            Some(draft.code.api_key.get_or_insert_with(String::new))
        }
        5 if draft.asset.credential_editable() => {
            Some(draft.asset.api_key.get_or_insert_with(String::new))
        }
        _ => None,
    }
}

fn cycled_kind(current: ProviderKind, step: isize) -> ProviderKind {
    let all = ProviderKind::ALL;
    let index = all.iter().position(|kind| *kind == current).unwrap_or(0) as isize;
    let len = all.len() as isize;
    let next = (index + step).rem_euclid(len);
    all[next as usize]
}
