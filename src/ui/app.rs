use std::mem;

use anyhow::Result;
use chrono::NaiveDate;
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

use crate::db::Store;
use crate::error::{LibraryError, LibraryResult};
use crate::library::{self, access, books, loans, members, staff};
use crate::models::{BookUpdate, MemberUpdate, NewBook, NewMember, NewStaff, Staff, StaffUpdate};

use super::forms::{ConfirmRemoval, Form};
use super::helpers::{centered_rect, key_hints, surface_error};
use super::menu::{Action, MenuId, MenuState};
use super::views::{self, ResultScreen};

/// Header space for the application title and current menu.
const HEADER_HEIGHT: u16 = 3;
/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Lines moved by PageUp / PageDown on the results screen.
const PAGE_SIZE: i32 = 10;

/// What occupies the main area.
enum Screen {
    Menu,
    Results(ResultScreen),
}

/// Modal state layered over the current screen.
enum Mode {
    Normal,
    Filling(Form),
    ConfirmRemoval(ConfirmRemoval),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Result of running one menu action.
enum Outcome {
    Show { screen: ResultScreen, message: String },
    Confirm(ConfirmRemoval),
    OpenStaff(Staff),
    Stay,
}

fn show(title: &str, lines: Vec<Line<'static>>, message: String) -> Outcome {
    Outcome::Show {
        screen: ResultScreen::new(title, lines),
        message,
    }
}

fn need_form(form: Option<&Form>) -> LibraryResult<&Form> {
    form.ok_or_else(|| LibraryError::Validation("This action needs input.".to_string()))
}

/// Central application state shared across the TUI.
pub struct App {
    store: Store,
    menu: MenuState,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
    today: fn() -> NaiveDate,
}

impl App {
    pub fn new(store: Store) -> Self {
        Self::with_clock(store, library::today)
    }

    /// Build the app with a fixed source for "today".
    pub fn with_clock(store: Store, today: fn() -> NaiveDate) -> Self {
        Self {
            store,
            menu: MenuState::new(MenuId::Main),
            screen: Screen::Menu,
            mode: Mode::Normal,
            status: None,
            today,
        }
    }

    /// Feed one key press; returns `true` when the user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit),
            Mode::Filling(form) => self.handle_form_key(code, form),
            Mode::ConfirmRemoval(confirm) => self.handle_confirm_removal(code, confirm),
        };

        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Mode {
        if let Screen::Results(ref mut results) = self.screen {
            match code {
                KeyCode::Char('q') => *exit = true,
                KeyCode::Up => results.scroll_by(-1),
                KeyCode::Down => results.scroll_by(1),
                KeyCode::PageUp => results.scroll_by(-PAGE_SIZE),
                KeyCode::PageDown => results.scroll_by(PAGE_SIZE),
                KeyCode::Esc | KeyCode::Enter | KeyCode::Backspace => {
                    self.screen = Screen::Menu;
                }
                _ => {}
            }
            return Mode::Normal;
        }

        match code {
            KeyCode::Char('q') => {
                *exit = true;
                Mode::Normal
            }
            KeyCode::Esc => {
                if self.menu.menu == MenuId::Main {
                    *exit = true;
                } else {
                    self.clear_status();
                    self.menu = MenuState::new(MenuId::Main);
                }
                Mode::Normal
            }
            KeyCode::Up => {
                self.menu.move_selection(-1);
                Mode::Normal
            }
            KeyCode::Down => {
                self.menu.move_selection(1);
                Mode::Normal
            }
            KeyCode::Home => {
                self.menu.selected = 0;
                Mode::Normal
            }
            KeyCode::End => {
                self.menu.selected = self.menu.menu.entries().len() - 1;
                Mode::Normal
            }
            KeyCode::Char(ch) if ch.is_ascii_digit() => {
                let number = ch.to_digit(10).unwrap_or(0) as usize;
                if self.menu.select_number(number) {
                    let action = self.menu.current().action;
                    self.activate(action, exit)
                } else {
                    Mode::Normal
                }
            }
            KeyCode::Enter => {
                let action = self.menu.current().action;
                self.activate(action, exit)
            }
            _ => Mode::Normal,
        }
    }

    /// Run a menu entry: navigate, open its form, or execute it directly.
    fn activate(&mut self, action: Action, exit: &mut bool) -> Mode {
        match action {
            Action::Quit => {
                *exit = true;
                Mode::Normal
            }
            Action::Open(menu) => {
                self.clear_status();
                self.menu = MenuState::new(menu);
                Mode::Normal
            }
            Action::Back => {
                self.clear_status();
                self.menu = MenuState::new(MenuId::Main);
                Mode::Normal
            }
            _ => {
                if let Some(form) = Form::for_action(action) {
                    self.clear_status();
                    return Mode::Filling(form);
                }
                match self.execute(action, None) {
                    Ok(outcome) => self.apply_outcome(outcome),
                    Err(err) => {
                        self.set_status(surface_error(&err), StatusKind::Error);
                        Mode::Normal
                    }
                }
            }
        }
    }

    fn handle_form_key(&mut self, code: KeyCode, mut form: Form) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status(format!("{} cancelled.", form.title), StatusKind::Info);
                Mode::Normal
            }
            KeyCode::Tab | KeyCode::Down => {
                form.next_field();
                Mode::Filling(form)
            }
            KeyCode::BackTab | KeyCode::Up => {
                form.previous_field();
                Mode::Filling(form)
            }
            KeyCode::Backspace => {
                form.backspace();
                Mode::Filling(form)
            }
            KeyCode::Enter => self.submit_form(form),
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
                Mode::Filling(form)
            }
            _ => Mode::Filling(form),
        }
    }

    fn submit_form(&mut self, mut form: Form) -> Mode {
        match self.execute(form.action, Some(&form)) {
            Ok(outcome) => self.apply_outcome(outcome),
            Err(err) => {
                let message = surface_error(&err);
                self.set_status(message.clone(), StatusKind::Error);
                if form.action == Action::EnterStaff && err.is_precondition() {
                    // Denied: back to the main menu; the next attempt asks again.
                    Mode::Normal
                } else {
                    form.error = Some(message);
                    Mode::Filling(form)
                }
            }
        }
    }

    fn handle_confirm_removal(&mut self, code: KeyCode, confirm: ConfirmRemoval) -> Mode {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Removal cancelled.", StatusKind::Info);
                Mode::Normal
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.perform_removal(&confirm) {
                    Ok(message) => self.set_status(message, StatusKind::Info),
                    Err(err) => self.set_status(surface_error(&err), StatusKind::Error),
                }
                Mode::Normal
            }
            _ => Mode::ConfirmRemoval(confirm),
        }
    }

    fn perform_removal(&mut self, confirm: &ConfirmRemoval) -> LibraryResult<String> {
        let id = confirm.id;
        match confirm.action {
            Action::RemoveBook => {
                let book = books::remove_book(&mut self.store, id)?;
                Ok(format!("Removed book {id}: {}.", book.title))
            }
            Action::RemoveMember => {
                let member = members::remove_member(&mut self.store, id)?;
                Ok(format!("Removed member {id}: {}.", member.full_name()))
            }
            Action::RemoveStaff => {
                let person = staff::remove_staff(&mut self.store, id)?;
                Ok(format!("Removed staff {id}: {}.", person.full_name()))
            }
            _ => Ok(String::new()),
        }
    }

    fn apply_outcome(&mut self, outcome: Outcome) -> Mode {
        match outcome {
            Outcome::Show { screen, message } => {
                self.screen = Screen::Results(screen);
                self.set_status(message, StatusKind::Info);
                Mode::Normal
            }
            Outcome::Confirm(confirm) => Mode::ConfirmRemoval(confirm),
            Outcome::OpenStaff(person) => {
                self.menu = MenuState::new(MenuId::Staff);
                self.screen = Screen::Menu;
                self.set_status(
                    format!("Welcome, {} ({}).", person.full_name(), person.role),
                    StatusKind::Info,
                );
                Mode::Normal
            }
            Outcome::Stay => Mode::Normal,
        }
    }

    /// Dispatch an operation to the library layer and describe the result.
    fn execute(&mut self, action: Action, form: Option<&Form>) -> LibraryResult<Outcome> {
        let today = (self.today)();
        let outcome = match action {
            Action::EnterStaff => {
                let id = need_form(form)?.id("Your Staff ID")?;
                Outcome::OpenStaff(access::authorize_staff_management(&self.store, id)?)
            }

            Action::BorrowBook => {
                let form = need_form(form)?;
                let (member_id, book_id) = (form.id("Member ID")?, form.id("Book ID")?);
                let loan = loans::borrow_book(&mut self.store, member_id, book_id, today)?;
                let message = format!("Book {book_id} borrowed. Due back {}.", loan.due_date);
                show("Book Borrowed", views::loan_summary(&loan), message)
            }
            Action::RenewLoan => {
                let form = need_form(form)?;
                let (member_id, book_id) = (form.id("Member ID")?, form.id("Book ID")?);
                let loan = loans::renew_loan(&mut self.store, member_id, book_id, today)?;
                let message = format!("Loan renewed. New due date {}.", loan.due_date);
                show("Loan Renewed", views::loan_summary(&loan), message)
            }
            Action::ReturnBook => {
                let form = need_form(form)?;
                let (member_id, book_id) = (form.id("Member ID")?, form.id("Book ID")?);
                let loan = loans::return_book(&mut self.store, member_id, book_id)?;
                let message = format!("Book {book_id} returned.");
                show("Book Returned", views::loan_summary(&loan), message)
            }
            Action::ActiveLoans => {
                let active = loans::active_loans(&self.store)?;
                let message = format!("{} active loan(s).", active.len());
                show("Active Loans", views::loan_table(&active, today), message)
            }
            Action::OverdueLoans => {
                let overdue = loans::overdue_loans(&self.store, today)?;
                let message = format!("{} overdue loan(s) as of {today}.", overdue.len());
                show("Overdue Loans", views::loan_table(&overdue, today), message)
            }
            Action::MemberHistory => {
                let member_id = need_form(form)?.id("Member ID")?;
                let history = loans::member_loans(&self.store, member_id)?;
                let message = format!("{} loan(s) on record.", history.len());
                let title = format!("Loan History: Member {member_id}");
                show(&title, views::loan_table(&history, today), message)
            }

            Action::AddBook => {
                let form = need_form(form)?;
                let new = NewBook {
                    title: form.text_or_empty("Title"),
                    author: form.text_or_empty("Author"),
                    isbn: form.text_or_empty("ISBN"),
                    publication_year: form.year("Publication Year")?,
                    genre: form.text("Genre"),
                    total_copies: form.id("Total Copies")?,
                };
                let book = books::add_book(&mut self.store, new, today)?;
                let message = format!("Added book {}.", book.id);
                show("Book Added", views::book_details(&book), message)
            }
            Action::UpdateBook => {
                let form = need_form(form)?;
                let id = form.id("Book ID")?;
                let update = BookUpdate {
                    title: form.text("Title"),
                    author: form.text("Author"),
                    isbn: form.text("ISBN"),
                    publication_year: form.year("Publication Year")?,
                    genre: form.text("Genre"),
                    total_copies: form.number("Total Copies")?,
                };
                let book = books::update_book(&mut self.store, id, update, today)?;
                show("Book Updated", views::book_details(&book), format!("Updated book {id}."))
            }
            Action::RemoveBook => {
                let id = need_form(form)?.id("Book ID")?;
                let book = books::get_book(&self.store, id)?;
                Outcome::Confirm(ConfirmRemoval {
                    action,
                    id,
                    description: format!("book {id}, {book}"),
                })
            }
            Action::ViewBook => {
                let id = need_form(form)?.id("Book ID")?;
                let book = books::get_book(&self.store, id)?;
                show("Book Details", views::book_details(&book), format!("Book {id}."))
            }
            Action::ListBooks => {
                let all = books::list_books(&self.store)?;
                let message = format!("{} book(s) in the catalogue.", all.len());
                show("All Books", views::book_table(&all), message)
            }
            Action::SearchBooks => {
                let term = need_form(form)?.text_or_empty("Title, author, genre or ISBN");
                let found = books::search_books(&self.store, &term)?;
                let message = format!("{} book(s) match '{term}'.", found.len());
                show("Book Search", views::book_table(&found), message)
            }

            Action::AddMember => {
                let form = need_form(form)?;
                let new = NewMember {
                    first_name: form.text_or_empty("First Name"),
                    last_name: form.text_or_empty("Last Name"),
                    email: form.text("Email"),
                    phone: form.text("Phone"),
                    address: form.text("Address"),
                };
                let member = members::add_member(&mut self.store, new, today)?;
                let message = format!("Added member {}.", member.id);
                show("Member Added", views::member_details(&member), message)
            }
            Action::UpdateMember => {
                let form = need_form(form)?;
                let id = form.id("Member ID")?;
                let update = MemberUpdate {
                    first_name: form.text("First Name"),
                    last_name: form.text("Last Name"),
                    email: form.text("Email"),
                    phone: form.text("Phone"),
                    address: form.text("Address"),
                };
                let member = members::update_member(&mut self.store, id, update)?;
                let message = format!("Updated member {id}.");
                show("Member Updated", views::member_details(&member), message)
            }
            Action::RemoveMember => {
                let id = need_form(form)?.id("Member ID")?;
                let member = members::get_member(&self.store, id)?;
                Outcome::Confirm(ConfirmRemoval {
                    action,
                    id,
                    description: format!("member {id}, {}", member.full_name()),
                })
            }
            Action::ViewMember => {
                let id = need_form(form)?.id("Member ID")?;
                let member = members::get_member(&self.store, id)?;
                show("Member Details", views::member_details(&member), format!("Member {id}."))
            }
            Action::ListMembers => {
                let all = members::list_members(&self.store)?;
                let message = format!("{} member(s).", all.len());
                show("All Members", views::member_table(&all), message)
            }
            Action::SearchMembers => {
                let term = need_form(form)?.text_or_empty("Name or email");
                let found = members::search_members(&self.store, &term)?;
                let message = format!("{} member(s) match '{term}'.", found.len());
                show("Member Search", views::member_table(&found), message)
            }

            Action::AddStaff => {
                let form = need_form(form)?;
                let role = form
                    .role("Role")?
                    .ok_or_else(|| LibraryError::Validation("Role is required.".to_string()))?;
                let new = NewStaff {
                    first_name: form.text_or_empty("First Name"),
                    last_name: form.text_or_empty("Last Name"),
                    role,
                    email: form.text("Email"),
                    phone: form.text("Phone"),
                };
                let person = staff::add_staff(&mut self.store, new, today)?;
                let message = format!("Added staff {}.", person.id);
                show("Staff Added", views::staff_details(&person), message)
            }
            Action::UpdateStaff => {
                let form = need_form(form)?;
                let id = form.id("Staff ID")?;
                let update = StaffUpdate {
                    first_name: form.text("First Name"),
                    last_name: form.text("Last Name"),
                    role: form.role("Role")?,
                    email: form.text("Email"),
                    phone: form.text("Phone"),
                };
                let person = staff::update_staff(&mut self.store, id, update)?;
                let message = format!("Updated staff {id}.");
                show("Staff Updated", views::staff_details(&person), message)
            }
            Action::RemoveStaff => {
                let id = need_form(form)?.id("Staff ID")?;
                let person = staff::get_staff(&self.store, id)?;
                Outcome::Confirm(ConfirmRemoval {
                    action,
                    id,
                    description: format!("staff {id}, {} ({})", person.full_name(), person.role),
                })
            }
            Action::ViewStaff => {
                let id = need_form(form)?.id("Staff ID")?;
                let person = staff::get_staff(&self.store, id)?;
                show("Staff Details", views::staff_details(&person), format!("Staff {id}."))
            }
            Action::ListStaff => {
                let all = staff::list_staff(&self.store)?;
                let message = format!("{} staff member(s).", all.len());
                show("All Staff", views::staff_table(&all), message)
            }

            Action::Open(_) | Action::Back | Action::Quit => Outcome::Stay,
        };
        Ok(outcome)
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT.min(area.height)),
                Constraint::Min(0),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        self.draw_header(frame, chunks[0]);
        match &self.screen {
            Screen::Menu => self.draw_menu(frame, chunks[1]),
            Screen::Results(results) => self.draw_results(frame, chunks[1], results),
        }
        self.draw_footer(frame, chunks[2]);

        match &self.mode {
            Mode::Filling(form) => self.draw_form(frame, area, form),
            Mode::ConfirmRemoval(confirm) => self.draw_confirm_removal(frame, area, confirm),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let line = Line::from(vec![
            Span::styled(
                "Library Manager",
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  /  "),
            Span::styled(self.menu.menu.title(), Style::default().fg(Color::Yellow)),
        ]);
        let date = format!(" {} ", (self.today)());
        let paragraph = Paragraph::new(line).block(
            Block::default()
                .borders(Borders::ALL)
                .title_bottom(Line::from(date).alignment(Alignment::Right)),
        );
        frame.render_widget(paragraph, area);
    }

    fn draw_menu(&self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .menu
            .menu
            .entries()
            .iter()
            .enumerate()
            .map(|(idx, entry)| ListItem::new(format!("{}. {}", idx + 1, entry.label)))
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(self.menu.menu.title()),
            )
            .highlight_style(
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");

        let mut state = ListState::default();
        state.select(Some(self.menu.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_results(&self, frame: &mut Frame, area: Rect, results: &ResultScreen) {
        let paragraph = Paragraph::new(results.lines.clone())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(results.title.clone()),
            )
            .scroll((results.scroll, 0));
        frame.render_widget(paragraph, area);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        match (&self.screen, &self.mode) {
            (_, Mode::Filling(_)) => key_hints(&[
                ("Tab", "Next Field"),
                ("Enter", "Submit"),
                ("Esc", "Cancel"),
            ]),
            (_, Mode::ConfirmRemoval(_)) => key_hints(&[("Y", "Remove"), ("N/Esc", "Keep")]),
            (Screen::Results(_), _) => key_hints(&[
                ("↑↓", "Scroll"),
                ("PgUp/PgDn", "Page"),
                ("Esc", "Back to Menu"),
                ("q", "Quit"),
            ]),
            (Screen::Menu, _) if self.menu.menu == MenuId::Main => key_hints(&[
                ("↑↓", "Navigate"),
                ("Enter/1-9", "Select"),
                ("q", "Quit"),
            ]),
            (Screen::Menu, _) => key_hints(&[
                ("↑↓", "Navigate"),
                ("Enter/1-9", "Select"),
                ("Esc", "Main Menu"),
                ("q", "Quit"),
            ]),
        }
    }

    fn draw_form(&self, frame: &mut Frame, area: Rect, form: &Form) {
        let popup_area = centered_rect(70, 60, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(form.title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines: Vec<Line> = (0..form.fields.len())
            .map(|idx| form.build_line(idx))
            .collect();
        lines.push(Line::from(""));

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to submit, Tab to switch fields, Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines);
        frame.render_widget(paragraph, inner);

        let cursor_x = inner.x + form.cursor_offset() as u16;
        let cursor_y = inner.y + form.active as u16;
        frame.set_cursor_position((cursor_x, cursor_y));
    }

    fn draw_confirm_removal(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmRemoval) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Confirm Removal")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!("Remove {}?", confirm.description)),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LoanStatus, StaffRole};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn fixed_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 1).unwrap()
    }

    fn app() -> App {
        let mut store = Store::open_in_memory().unwrap();
        members::add_member(
            &mut store,
            NewMember {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                ..NewMember::default()
            },
            fixed_today(),
        )
        .unwrap();
        books::add_book(
            &mut store,
            NewBook {
                title: "Emma".into(),
                author: "Jane Austen".into(),
                isbn: "emma".into(),
                publication_year: Some(1815),
                genre: None,
                total_copies: 2,
            },
            fixed_today(),
        )
        .unwrap();
        App::with_clock(store, fixed_today)
    }

    fn press(app: &mut App, keys: &str) {
        for ch in keys.chars() {
            app.handle_key(KeyCode::Char(ch)).unwrap();
        }
    }

    fn key(app: &mut App, code: KeyCode) {
        app.handle_key(code).unwrap();
    }

    fn status(app: &App) -> (StatusKind, String) {
        let status = app.status.as_ref().expect("status message");
        (status.kind, status.text.clone())
    }

    #[test]
    fn borrow_through_the_menus() {
        let mut app = app();
        press(&mut app, "1"); // Loan Management
        assert_eq!(app.menu.menu, MenuId::Loans);
        press(&mut app, "1"); // Borrow a Book
        assert!(matches!(app.mode, Mode::Filling(_)));
        press(&mut app, "1");
        key(&mut app, KeyCode::Tab);
        press(&mut app, "1");
        key(&mut app, KeyCode::Enter);

        assert!(matches!(app.mode, Mode::Normal));
        assert!(matches!(app.screen, Screen::Results(_)));
        let (kind, text) = status(&app);
        assert_eq!(kind, StatusKind::Info);
        assert_eq!(text, "Book 1 borrowed. Due back 2024-10-15.");
        assert_eq!(books::get_book(&app.store, 1).unwrap().available_copies, 1);

        key(&mut app, KeyCode::Esc);
        assert!(matches!(app.screen, Screen::Menu));
        assert_eq!(app.menu.menu, MenuId::Loans);
    }

    #[test]
    fn precondition_failure_keeps_form_open_with_message() {
        let mut app = app();
        press(&mut app, "11");
        press(&mut app, "42");
        key(&mut app, KeyCode::Tab);
        press(&mut app, "1");
        key(&mut app, KeyCode::Enter);

        match &app.mode {
            Mode::Filling(form) => {
                assert_eq!(form.error.as_deref(), Some("Member 42 not found."))
            }
            _ => panic!("form should stay open"),
        }
        assert_eq!(status(&app).0, StatusKind::Error);
        assert!(loans::active_loans(&app.store).unwrap().is_empty());
    }

    #[test]
    fn return_after_borrow_restocks() {
        let mut app = app();
        loans::borrow_book(&mut app.store, 1, 1, fixed_today()).unwrap();
        press(&mut app, "13");
        press(&mut app, "1");
        key(&mut app, KeyCode::Tab);
        press(&mut app, "1");
        key(&mut app, KeyCode::Enter);

        assert_eq!(status(&app).1, "Book 1 returned.");
        let history = loans::member_loans(&app.store, 1).unwrap();
        assert_eq!(history[0].loan.status, LoanStatus::Returned);
        assert_eq!(books::get_book(&app.store, 1).unwrap().available_copies, 2);
    }

    #[test]
    fn overdue_listing_runs_without_a_form() {
        let mut app = app();
        press(&mut app, "15");
        assert!(matches!(app.mode, Mode::Normal));
        assert!(matches!(app.screen, Screen::Results(_)));
        assert_eq!(status(&app).1, "0 overdue loan(s) as of 2024-10-01.");
    }

    #[test]
    fn staff_gate_denies_then_admits_and_asks_again() {
        let mut app = app();
        let clerk = staff::add_staff(
            &mut app.store,
            NewStaff {
                first_name: "Clerk".into(),
                last_name: "Kent".into(),
                role: StaffRole::Assistant,
                email: None,
                phone: None,
            },
            fixed_today(),
        )
        .unwrap();

        press(&mut app, "4");
        press(&mut app, &clerk.id.to_string());
        key(&mut app, KeyCode::Enter);
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.menu.menu, MenuId::Main);
        assert_eq!(status(&app).0, StatusKind::Error);

        press(&mut app, "4");
        press(&mut app, "1"); // seeded manager
        key(&mut app, KeyCode::Enter);
        assert_eq!(app.menu.menu, MenuId::Staff);
        assert_eq!(status(&app).1, "Welcome, Library Manager (Manager).");

        press(&mut app, "6"); // Back to Main Menu
        assert_eq!(app.menu.menu, MenuId::Main);
        press(&mut app, "4");
        assert!(matches!(&app.mode, Mode::Filling(form) if form.action == Action::EnterStaff));
    }

    #[test]
    fn removal_asks_for_confirmation() {
        let mut app = app();
        press(&mut app, "2"); // Book Management
        press(&mut app, "3"); // Remove a Book
        press(&mut app, "1");
        key(&mut app, KeyCode::Enter);
        assert!(matches!(app.mode, Mode::ConfirmRemoval(_)));

        press(&mut app, "n");
        assert!(books::get_book(&app.store, 1).is_ok());

        press(&mut app, "3");
        press(&mut app, "1");
        key(&mut app, KeyCode::Enter);
        press(&mut app, "y");
        assert_eq!(status(&app).1, "Removed book 1: Emma.");
        assert!(books::get_book(&app.store, 1).is_err());
    }

    #[test]
    fn update_form_keeps_blank_fields() {
        let mut app = app();
        press(&mut app, "22"); // Book Management, Update a Book
        press(&mut app, "1");
        key(&mut app, KeyCode::Tab);
        press(&mut app, "Emma (Annotated)");
        key(&mut app, KeyCode::Enter);

        let book = books::get_book(&app.store, 1).unwrap();
        assert_eq!(book.title, "Emma (Annotated)");
        assert_eq!(book.author, "Jane Austen");
        assert_eq!(book.total_copies, 2);
    }

    #[test]
    fn escape_walks_back_then_quits() {
        let mut app = app();
        press(&mut app, "3");
        assert_eq!(app.menu.menu, MenuId::Members);
        assert!(!app.handle_key(KeyCode::Esc).unwrap());
        assert_eq!(app.menu.menu, MenuId::Main);
        assert!(app.handle_key(KeyCode::Esc).unwrap());
    }

    #[test]
    fn every_screen_renders() {
        let mut app = app();
        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| app.draw(frame)).unwrap();

        press(&mut app, "14"); // Active loans
        terminal.draw(|frame| app.draw(frame)).unwrap();
        key(&mut app, KeyCode::Esc);

        press(&mut app, "1"); // Borrow form
        terminal.draw(|frame| app.draw(frame)).unwrap();
    }
}
