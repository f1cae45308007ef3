use crossterm::event::KeyCode;
use zeroize::Zeroize;

use crate::models::Entry;

pub const FIELD_COUNT: usize = 4;

/// Direction for moving focus through the form ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn offset(self) -> usize {
        match self {
            Direction::Forward => 1,
            Direction::Backward => FIELD_COUNT - 1,
        }
    }
}

/// Next cursor on the ring of form fields. Wraps in both directions.
pub fn advance_focus(cursor: usize, direction: Direction) -> usize {
    (cursor % FIELD_COUNT + direction.offset()) % FIELD_COUNT
}

/// Single-line text buffer. Only accepts keys while focused.
#[derive(Debug, Default, Clone)]
pub struct TextInput {
    value: String,
    focused: bool,
    masked: bool,
}

impl TextInput {
    pub fn masked() -> Self {
        Self {
            masked: true,
            ..Self::default()
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value.zeroize();
        self.value = value.into();
    }

    pub fn clear(&mut self) {
        self.value.zeroize();
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    pub fn is_masked(&self) -> bool {
        self.masked
    }

    /// Text to render: the value, or one `*` per character when masked.
    pub fn display(&self) -> String {
        if self.masked {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        if !self.focused {
            return;
        }
        match code {
            KeyCode::Char(c) => self.value.push(c),
            KeyCode::Backspace => {
                self.value.pop();
            }
            _ => {}
        }
    }
}

/// The four-slot new-entry form. Exactly one slot is focused while open, none while closed.
#[derive(Debug, Default)]
pub struct NewEntryForm {
    fields: [TextInput; FIELD_COUNT],
    cursor: usize,
}

impl NewEntryForm {
    pub const LABELS: [&'static str; FIELD_COUNT] = ["Title", "User name", "Password", "URL"];
    const PASSWORD_SLOT: usize = 2;

    /// Fresh form with title focused and the password slot pre-filled.
    pub fn open(generated_password: String) -> Self {
        let mut form = Self::default();
        form.fields[Self::PASSWORD_SLOT] = TextInput::masked();
        form.fields[Self::PASSWORD_SLOT].set_value(generated_password);
        form.fields[0].focus();
        form
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &TextInput)> {
        Self::LABELS.into_iter().zip(self.fields.iter())
    }

    pub fn focused_count(&self) -> usize {
        self.fields.iter().filter(|f| f.is_focused()).count()
    }

    pub fn move_focus(&mut self, direction: Direction) {
        self.fields[self.cursor].blur();
        self.cursor = advance_focus(self.cursor, direction);
        self.fields[self.cursor].focus();
    }

    /// Forwards an editing key to the focused slot.
    pub fn handle_key(&mut self, code: KeyCode) {
        self.fields[self.cursor].handle_key(code);
    }

    /// Packages the four slot values verbatim into a new entry.
    pub fn to_entry(&self) -> Entry {
        Entry::with_fields(
            self.fields[0].value(),
            self.fields[1].value(),
            self.fields[2].value(),
            self.fields[3].value(),
        )
    }

    /// Wipes every slot and drops focus.
    pub fn close(&mut self) {
        for field in &mut self.fields {
            field.clear();
            field.blur();
        }
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_focus_wraps_both_ways() {
        assert_eq!(advance_focus(0, Direction::Forward), 1);
        assert_eq!(advance_focus(3, Direction::Forward), 0);
        assert_eq!(advance_focus(0, Direction::Backward), 3);
        assert_eq!(advance_focus(2, Direction::Backward), 1);
    }

    #[test]
    fn forward_then_backward_is_identity() {
        for cursor in 0..FIELD_COUNT {
            let there = advance_focus(cursor, Direction::Forward);
            assert!(there < FIELD_COUNT);
            assert_eq!(advance_focus(there, Direction::Backward), cursor);
        }
    }

    #[test]
    fn open_focuses_title_and_prefills_password() {
        let form = NewEntryForm::open("Gen3rated!".into());
        assert_eq!(form.cursor(), 0);
        assert_eq!(form.focused_count(), 1);
        let fields: Vec<_> = form.fields().collect();
        assert!(fields[0].1.is_focused());
        assert_eq!(fields[2].1.value(), "Gen3rated!");
        assert!(fields[2].1.is_masked());
        assert_eq!(fields[2].1.display(), "**********");
    }

    #[test]
    fn exactly_one_field_focused_while_cycling() {
        let mut form = NewEntryForm::open(String::new());
        for _ in 0..9 {
            form.move_focus(Direction::Forward);
            assert_eq!(form.focused_count(), 1);
        }
        for _ in 0..6 {
            form.move_focus(Direction::Backward);
            assert_eq!(form.focused_count(), 1);
        }
        assert_eq!(form.cursor(), 3);
        let (_, focused) = form.fields().nth(3).unwrap();
        assert!(focused.is_focused());
    }

    #[test]
    fn keys_only_reach_the_focused_slot() {
        let mut form = NewEntryForm::open("pw".into());
        form.handle_key(KeyCode::Char('a'));
        form.move_focus(Direction::Forward);
        form.handle_key(KeyCode::Char('b'));
        form.handle_key(KeyCode::Char('c'));
        form.handle_key(KeyCode::Backspace);
        let entry = form.to_entry();
        assert_eq!(entry.title(), "a");
        assert_eq!(entry.username(), "b");
        assert_eq!(entry.password(), "pw");
        assert_eq!(entry.url(), "");
    }

    #[test]
    fn close_blurs_and_wipes() {
        let mut form = NewEntryForm::open("secret".into());
        form.move_focus(Direction::Forward);
        form.close();
        assert_eq!(form.focused_count(), 0);
        assert!(form.fields().all(|(_, f)| f.value().is_empty()));
    }

    #[test]
    fn unfocused_input_ignores_keys() {
        let mut input = TextInput::default();
        input.handle_key(KeyCode::Char('x'));
        assert_eq!(input.value(), "");
        input.focus();
        input.handle_key(KeyCode::Char('x'));
        assert_eq!(input.value(), "x");
    }
}
