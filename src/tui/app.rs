use crate::clients::FetchRequest;
use crate::flow::{FlowController, FlowState};
use crate::models::{parse_entry, Field, PlayerRecord};
use crate::scoring::RuleKey;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Which text box of the acquisition form receives typed input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FormField {
    ClanTag,
    ApiKey,
}

pub struct App {
    pub flow: FlowController,
    pub input_mode: InputMode,
    pub form_field: FormField,
    pub clan_tag: String,
    pub api_key: String,
    pub current_input: String,
    pub selected_player: usize,
    pub selected_field: usize,
    pub selected_rule: usize,
    pub export_path: String,
    pub status_message: Option<String>,
    pub loading_message: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(flow: FlowController, export_path: impl Into<String>) -> Self {
        Self {
            flow,
            input_mode: InputMode::Normal,
            form_field: FormField::ClanTag,
            clan_tag: String::new(),
            api_key: String::new(),
            current_input: String::new(),
            selected_player: 0,
            selected_field: 0,
            selected_rule: 0,
            export_path: export_path.into(),
            status_message: None,
            loading_message: None,
            should_quit: false,
        }
    }

    pub fn fetch_request(&self) -> FetchRequest {
        FetchRequest::new(self.clan_tag.trim(), self.api_key.trim())
    }

    pub fn start_form_edit(&mut self, field: FormField) {
        self.form_field = field;
        self.current_input = match field {
            FormField::ClanTag => self.clan_tag.clone(),
            FormField::ApiKey => self.api_key.clone(),
        };
        self.input_mode = InputMode::Editing;
    }

    pub fn commit_form_edit(&mut self) {
        let value = std::mem::take(&mut self.current_input);
        match self.form_field {
            FormField::ClanTag => self.clan_tag = value,
            FormField::ApiKey => self.api_key = value,
        }
        self.input_mode = InputMode::Normal;
    }

    pub fn cancel_edit(&mut self) {
        self.current_input.clear();
        self.input_mode = InputMode::Normal;
    }

    pub fn player_count(&self) -> usize {
        self.flow.state().roster().map_or(0, |r| r.len())
    }

    pub fn selected_record(&self) -> Option<&PlayerRecord> {
        self.flow.state().roster()?.players().get(self.selected_player)
    }

    pub fn selected_field(&self) -> Field {
        let fields = Field::all();
        fields[self.selected_field.min(fields.len() - 1)]
    }

    pub fn move_player(&mut self, delta: isize) {
        self.selected_player = step(self.selected_player, delta, self.player_count());
    }

    pub fn move_field(&mut self, delta: isize) {
        self.selected_field = step(self.selected_field, delta, Field::all().len());
    }

    pub fn move_rule(&mut self, delta: isize) {
        self.selected_rule = step(self.selected_rule, delta, RuleKey::ALL.len());
    }

    pub fn selected_rule(&self) -> RuleKey {
        RuleKey::ALL[self.selected_rule.min(RuleKey::ALL.len() - 1)]
    }

    /// Seeds the input box with the selected cell's current value.
    pub fn start_cell_edit(&mut self) {
        let field = self.selected_field();
        self.current_input = self
            .selected_record()
            .and_then(|r| r.get(field))
            .map(|v| v.to_string())
            .unwrap_or_default();
        self.input_mode = InputMode::Editing;
    }

    pub fn start_rule_edit(&mut self) {
        let key = self.selected_rule();
        self.current_input = match self.flow.state() {
            FlowState::EditRuleTable { draft } => draft.get(key).to_string(),
            _ => String::new(),
        };
        self.input_mode = InputMode::Editing;
    }

    /// The typed cell value. Anything that is not a whole number, blank
    /// included, is unknown.
    pub fn parsed_cell_input(&self) -> Option<i64> {
        parse_entry(&self.current_input)
    }

    /// The typed rule value; anything that is not a whole number counts as 0.
    pub fn parsed_rule_input(&self) -> i64 {
        parse_entry(&self.current_input).unwrap_or(0)
    }

    pub fn set_loading(&mut self, message: &str) {
        self.loading_message = Some(message.to_string());
        self.status_message = None;
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    /// Called after every transition so the cursors stay inside the new data.
    pub fn clamp_selection(&mut self) {
        self.selected_player = self.selected_player.min(self.player_count().saturating_sub(1));
    }
}

fn step(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let next = current as isize + delta;
    next.clamp(0, len as isize - 1) as usize
}
