use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::error::{LibraryError, LibraryResult};
use crate::models::StaffRole;

use super::menu::Action;

/// What a field accepts while typing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum FieldKind {
    /// Digits only.
    Integer,
    Text,
}

#[derive(Clone, Debug)]
pub(crate) struct Field {
    pub(crate) label: &'static str,
    pub(crate) kind: FieldKind,
    /// Shown while the field is empty.
    pub(crate) placeholder: &'static str,
    pub(crate) value: String,
}

impl Field {
    fn required(label: &'static str, kind: FieldKind) -> Self {
        Self {
            label,
            kind,
            placeholder: "<required>",
            value: String::new(),
        }
    }

    fn optional(label: &'static str, kind: FieldKind) -> Self {
        Self {
            label,
            kind,
            placeholder: "<optional>",
            value: String::new(),
        }
    }

    /// Edit forms: leaving the field blank keeps the stored value.
    fn keep(label: &'static str, kind: FieldKind) -> Self {
        Self {
            label,
            kind,
            placeholder: "<keep current>",
            value: String::new(),
        }
    }
}

/// Input form opened by a menu action. Values stay raw text until submit.
#[derive(Clone, Debug)]
pub(crate) struct Form {
    pub(crate) title: &'static str,
    pub(crate) action: Action,
    pub(crate) fields: Vec<Field>,
    pub(crate) active: usize,
    pub(crate) error: Option<String>,
}

use FieldKind::{Integer, Text};

impl Form {
    fn new(title: &'static str, action: Action, fields: Vec<Field>) -> Self {
        Self {
            title,
            action,
            fields,
            active: 0,
            error: None,
        }
    }

    /// The form an action needs, or `None` when it runs without input.
    pub(crate) fn for_action(action: Action) -> Option<Self> {
        let loan_pair = || {
            vec![
                Field::required("Member ID", Integer),
                Field::required("Book ID", Integer),
            ]
        };
        let form = match action {
            Action::EnterStaff => Form::new(
                "Staff Access",
                action,
                vec![Field::required("Your Staff ID", Integer)],
            ),
            Action::BorrowBook => Form::new("Borrow a Book", action, loan_pair()),
            Action::RenewLoan => Form::new("Renew a Loan", action, loan_pair()),
            Action::ReturnBook => Form::new("Return a Book", action, loan_pair()),
            Action::MemberHistory => Form::new(
                "Member Loan History",
                action,
                vec![Field::required("Member ID", Integer)],
            ),
            Action::AddBook => Form::new(
                "Add a Book",
                action,
                vec![
                    Field::required("Title", Text),
                    Field::required("Author", Text),
                    Field::required("ISBN", Text),
                    Field::optional("Publication Year", Integer),
                    Field::optional("Genre", Text),
                    Field::required("Total Copies", Integer),
                ],
            ),
            Action::UpdateBook => Form::new(
                "Update a Book",
                action,
                vec![
                    Field::required("Book ID", Integer),
                    Field::keep("Title", Text),
                    Field::keep("Author", Text),
                    Field::keep("ISBN", Text),
                    Field::keep("Publication Year", Integer),
                    Field::keep("Genre", Text),
                    Field::keep("Total Copies", Integer),
                ],
            ),
            Action::RemoveBook => Form::new(
                "Remove a Book",
                action,
                vec![Field::required("Book ID", Integer)],
            ),
            Action::ViewBook => Form::new(
                "View Book Details",
                action,
                vec![Field::required("Book ID", Integer)],
            ),
            Action::SearchBooks => Form::new(
                "Search Books",
                action,
                vec![Field::optional("Title, author, genre or ISBN", Text)],
            ),
            Action::AddMember => Form::new(
                "Add a Member",
                action,
                vec![
                    Field::required("First Name", Text),
                    Field::required("Last Name", Text),
                    Field::optional("Email", Text),
                    Field::optional("Phone", Text),
                    Field::optional("Address", Text),
                ],
            ),
            Action::UpdateMember => Form::new(
                "Update a Member",
                action,
                vec![
                    Field::required("Member ID", Integer),
                    Field::keep("First Name", Text),
                    Field::keep("Last Name", Text),
                    Field::keep("Email", Text),
                    Field::keep("Phone", Text),
                    Field::keep("Address", Text),
                ],
            ),
            Action::RemoveMember => Form::new(
                "Remove a Member",
                action,
                vec![Field::required("Member ID", Integer)],
            ),
            Action::ViewMember => Form::new(
                "View Member Details",
                action,
                vec![Field::required("Member ID", Integer)],
            ),
            Action::SearchMembers => Form::new(
                "Search Members",
                action,
                vec![Field::optional("Name or email", Text)],
            ),
            Action::AddStaff => Form::new(
                "Add Staff",
                action,
                vec![
                    Field::required("First Name", Text),
                    Field::required("Last Name", Text),
                    Field::required("Role", Text),
                    Field::optional("Email", Text),
                    Field::optional("Phone", Text),
                ],
            ),
            Action::UpdateStaff => Form::new(
                "Update Staff",
                action,
                vec![
                    Field::required("Staff ID", Integer),
                    Field::keep("First Name", Text),
                    Field::keep("Last Name", Text),
                    Field::keep("Role", Text),
                    Field::keep("Email", Text),
                    Field::keep("Phone", Text),
                ],
            ),
            Action::RemoveStaff => Form::new(
                "Remove Staff",
                action,
                vec![Field::required("Staff ID", Integer)],
            ),
            Action::ViewStaff => Form::new(
                "View Staff Details",
                action,
                vec![Field::required("Staff ID", Integer)],
            ),
            _ => return None,
        };
        Some(form)
    }

    pub(crate) fn next_field(&mut self) {
        self.active = (self.active + 1) % self.fields.len();
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = (self.active + self.fields.len() - 1) % self.fields.len();
    }

    /// Append a character to the active field, validating allowed input.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        let field = &mut self.fields[self.active];
        let accepted = match field.kind {
            Integer => ch.is_ascii_digit(),
            Text => !ch.is_control(),
        };
        if accepted {
            field.value.push(ch);
        }
        accepted
    }

    /// Remove the last character from the active field.
    pub(crate) fn backspace(&mut self) {
        self.fields[self.active].value.pop();
    }

    fn raw(&self, label: &str) -> &str {
        self.fields
            .iter()
            .find(|field| field.label == label)
            .map(|field| field.value.trim())
            .unwrap_or("")
    }

    /// Trimmed text, `None` when blank.
    pub(crate) fn text(&self, label: &str) -> Option<String> {
        let value = self.raw(label);
        (!value.is_empty()).then(|| value.to_string())
    }

    /// Text handed to the library as-is; the library reports blanks.
    pub(crate) fn text_or_empty(&self, label: &str) -> String {
        self.raw(label).to_string()
    }

    /// Parse an optional whole number.
    pub(crate) fn number(&self, label: &str) -> LibraryResult<Option<i64>> {
        let value = self.raw(label);
        if value.is_empty() {
            return Ok(None);
        }
        value
            .parse::<i64>()
            .map(Some)
            .map_err(|_| LibraryError::Validation(format!("{label} must be a whole number.")))
    }

    /// A whole number that must be present, such as an entity id.
    pub(crate) fn id(&self, label: &str) -> LibraryResult<i64> {
        self.number(label)?
            .ok_or_else(|| LibraryError::Validation(format!("{label} is required.")))
    }

    pub(crate) fn year(&self, label: &str) -> LibraryResult<Option<i32>> {
        self.number(label)?
            .map(|year| {
                i32::try_from(year)
                    .map_err(|_| LibraryError::Validation(format!("{label} is out of range.")))
            })
            .transpose()
    }

    pub(crate) fn role(&self, label: &str) -> LibraryResult<Option<StaffRole>> {
        self.text(label).map(|role| role.parse()).transpose()
    }

    /// Render a single line for the form widget.
    pub(crate) fn build_line(&self, idx: usize) -> Line<'static> {
        let field = &self.fields[idx];
        let is_active = idx == self.active;

        let display = if field.value.is_empty() {
            field.placeholder.to_string()
        } else {
            field.value.clone()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if field.value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{}: ", field.label)),
            Span::styled(display, style),
        ])
    }

    /// Cursor column offset for the active field, counted from the block edge.
    pub(crate) fn cursor_offset(&self) -> usize {
        let field = &self.fields[self.active];
        field.label.chars().count() + 2 + field.value.chars().count()
    }
}

/// Pending removal awaiting a yes/no answer.
#[derive(Clone, Debug)]
pub(crate) struct ConfirmRemoval {
    pub(crate) action: Action,
    pub(crate) id: i64,
    pub(crate) description: String,
}
