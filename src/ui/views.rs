//! Turns library outcomes into the text shown on the results screen.

use chrono::NaiveDate;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::models::{Book, Loan, LoanDetails, Member, Staff};

/// Scrollable page of output produced by one action.
pub(crate) struct ResultScreen {
    pub(crate) title: String,
    pub(crate) lines: Vec<Line<'static>>,
    pub(crate) scroll: u16,
}

impl ResultScreen {
    pub(crate) fn new<S: Into<String>>(title: S, lines: Vec<Line<'static>>) -> Self {
        Self {
            title: title.into(),
            lines,
            scroll: 0,
        }
    }

    pub(crate) fn scroll_by(&mut self, offset: i32) {
        let max = self.lines.len().saturating_sub(1) as i32;
        self.scroll = (self.scroll as i32 + offset).clamp(0, max) as u16;
    }
}

fn heading(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    ))
}

fn field(label: &str, value: impl ToString) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<18}"), Style::default().fg(Color::Gray)),
        Span::raw(value.to_string()),
    ])
}

fn or_dash(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

fn empty(message: &str) -> Vec<Line<'static>> {
    vec![Line::from(Span::styled(
        message.to_string(),
        Style::default().fg(Color::DarkGray),
    ))]
}

pub(crate) fn book_details(book: &Book) -> Vec<Line<'static>> {
    vec![
        field("ID", book.id),
        field("Title", &book.title),
        field("Author", &book.author),
        field("ISBN", &book.isbn),
        field(
            "Published",
            book.publication_year
                .map(|year| year.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ),
        field("Genre", or_dash(&book.genre)),
        field(
            "Copies",
            format!("{} available of {}", book.available_copies, book.total_copies),
        ),
    ]
}

pub(crate) fn book_table(books: &[Book]) -> Vec<Line<'static>> {
    if books.is_empty() {
        return empty("No books found.");
    }
    let mut lines = vec![heading(&format!(
        "{:>5}  {:<32} {:<24} {:<15} {:>9}",
        "ID", "Title", "Author", "ISBN", "Available"
    ))];
    lines.extend(books.iter().map(|book| {
        let style = if book.available_copies == 0 {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };
        Line::from(Span::styled(
            format!(
                "{:>5}  {:<32} {:<24} {:<15} {:>4}/{:<4}",
                book.id,
                clip(&book.title, 32),
                clip(&book.author, 24),
                clip(&book.isbn, 15),
                book.available_copies,
                book.total_copies
            ),
            style,
        ))
    }));
    lines
}

pub(crate) fn member_details(member: &Member) -> Vec<Line<'static>> {
    vec![
        field("ID", member.id),
        field("Name", member.full_name()),
        field("Email", or_dash(&member.email)),
        field("Phone", or_dash(&member.phone)),
        field("Address", or_dash(&member.address)),
        field("Member since", member.membership_date),
    ]
}

pub(crate) fn member_table(members: &[Member]) -> Vec<Line<'static>> {
    if members.is_empty() {
        return empty("No members found.");
    }
    let mut lines = vec![heading(&format!(
        "{:>5}  {:<30} {:<30} {:<12}",
        "ID", "Name", "Email", "Joined"
    ))];
    lines.extend(members.iter().map(|member| {
        Line::from(format!(
            "{:>5}  {:<30} {:<30} {:<12}",
            member.id,
            clip(&member.full_name(), 30),
            clip(&or_dash(&member.email), 30),
            member.membership_date.to_string()
        ))
    }));
    lines
}

pub(crate) fn staff_details(staff: &Staff) -> Vec<Line<'static>> {
    vec![
        field("ID", staff.id),
        field("Name", staff.full_name()),
        field("Role", staff.role),
        field("Email", or_dash(&staff.email)),
        field("Phone", or_dash(&staff.phone)),
        field("Hired", staff.hire_date),
    ]
}

pub(crate) fn staff_table(staff: &[Staff]) -> Vec<Line<'static>> {
    if staff.is_empty() {
        return empty("No staff found.");
    }
    let mut lines = vec![heading(&format!(
        "{:>5}  {:<30} {:<16} {:<12}",
        "ID", "Name", "Role", "Hired"
    ))];
    lines.extend(staff.iter().map(|person| {
        Line::from(format!(
            "{:>5}  {:<30} {:<16} {:<12}",
            person.id,
            clip(&person.full_name(), 30),
            person.role.as_str(),
            person.hire_date.to_string()
        ))
    }));
    lines
}

pub(crate) fn loan_summary(loan: &Loan) -> Vec<Line<'static>> {
    vec![
        field("Loan ID", loan.id),
        field("Member ID", loan.member_id),
        field("Book ID", loan.book_id),
        field("Loan date", loan.loan_date),
        field("Due date", loan.due_date),
        field("Status", loan.status),
    ]
}

/// Loan listing; overdue rows are highlighted relative to `today`.
pub(crate) fn loan_table(loans: &[LoanDetails], today: NaiveDate) -> Vec<Line<'static>> {
    if loans.is_empty() {
        return empty("No loans found.");
    }
    let mut lines = vec![heading(&format!(
        "{:>5}  {:<24} {:<30} {:<10}  {:<10}  {:<8}",
        "Loan", "Member", "Book", "Borrowed", "Due", "Status"
    ))];
    lines.extend(loans.iter().map(|details| {
        let loan = &details.loan;
        let style = if loan.is_overdue(today) {
            Style::default().fg(Color::Red)
        } else {
            Style::default()
        };
        Line::from(Span::styled(
            format!(
                "{:>5}  {:<24} {:<30} {:<10}  {:<10}  {:<8}",
                loan.id,
                clip(&format!("{} (#{})", details.member_name, loan.member_id), 24),
                clip(&format!("{} (#{})", details.book_title, loan.book_id), 30),
                loan.loan_date.to_string(),
                loan.due_date.to_string(),
                loan.status
            ),
            style,
        ))
    }));
    lines
}

/// Shorten to `width` characters, marking the cut with `~`.
fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(width.saturating_sub(1)).collect();
    clipped.push('~');
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LoanStatus;

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn clip_keeps_short_text_and_marks_long_text() {
        assert_eq!(clip("Emma", 10), "Emma");
        assert_eq!(clip("Middlemarch", 6), "Middl~");
    }

    #[test]
    fn dates_render_as_plain_iso() {
        let loan = Loan {
            id: 1,
            member_id: 2,
            book_id: 3,
            loan_date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 3, 19).unwrap(),
            status: LoanStatus::Active,
        };
        let text: Vec<String> = loan_summary(&loan).iter().map(line_text).collect();
        assert!(text.iter().any(|line| line.ends_with("2024-03-05")));
        assert!(text.iter().any(|line| line.ends_with("2024-03-19")));
    }

    #[test]
    fn empty_listings_say_so() {
        assert_eq!(line_text(&book_table(&[])[0]), "No books found.");
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(line_text(&loan_table(&[], today)[0]), "No loans found.");
    }

    #[test]
    fn scroll_is_clamped() {
        let mut screen = ResultScreen::new("t", vec![Line::from("a"), Line::from("b")]);
        screen.scroll_by(-3);
        assert_eq!(screen.scroll, 0);
        screen.scroll_by(10);
        assert_eq!(screen.scroll, 1);
    }
}
