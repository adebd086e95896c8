/// Menus in the navigation tree. `Main` is the root; every other menu returns
/// to it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum MenuId {
    Main,
    Loans,
    Books,
    Members,
    Staff,
}

/// Everything a menu entry can trigger.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    Open(MenuId),
    EnterStaff,
    Back,
    Quit,

    BorrowBook,
    RenewLoan,
    ReturnBook,
    ActiveLoans,
    OverdueLoans,
    MemberHistory,

    AddBook,
    UpdateBook,
    RemoveBook,
    ViewBook,
    ListBooks,
    SearchBooks,

    AddMember,
    UpdateMember,
    RemoveMember,
    ViewMember,
    ListMembers,
    SearchMembers,

    AddStaff,
    UpdateStaff,
    RemoveStaff,
    ViewStaff,
    ListStaff,
}

pub(crate) struct MenuEntry {
    pub(crate) label: &'static str,
    pub(crate) action: Action,
}

const fn entry(label: &'static str, action: Action) -> MenuEntry {
    MenuEntry { label, action }
}

const MAIN: &[MenuEntry] = &[
    entry("Loan Management", Action::Open(MenuId::Loans)),
    entry("Book Management", Action::Open(MenuId::Books)),
    entry("Member Management", Action::Open(MenuId::Members)),
    entry("Staff Management", Action::EnterStaff),
    entry("Exit", Action::Quit),
];

const LOANS: &[MenuEntry] = &[
    entry("Borrow a Book", Action::BorrowBook),
    entry("Renew a Loan", Action::RenewLoan),
    entry("Return a Book", Action::ReturnBook),
    entry("View Active Loans", Action::ActiveLoans),
    entry("View Overdue Loans", Action::OverdueLoans),
    entry("Member Loan History", Action::MemberHistory),
    entry("Back to Main Menu", Action::Back),
];

const BOOKS: &[MenuEntry] = &[
    entry("Add a Book", Action::AddBook),
    entry("Update a Book", Action::UpdateBook),
    entry("Remove a Book", Action::RemoveBook),
    entry("View Book Details", Action::ViewBook),
    entry("List All Books", Action::ListBooks),
    entry("Search Books", Action::SearchBooks),
    entry("Back to Main Menu", Action::Back),
];

const MEMBERS: &[MenuEntry] = &[
    entry("Add a Member", Action::AddMember),
    entry("Update a Member", Action::UpdateMember),
    entry("Remove a Member", Action::RemoveMember),
    entry("View Member Details", Action::ViewMember),
    entry("List All Members", Action::ListMembers),
    entry("Search Members", Action::SearchMembers),
    entry("Back to Main Menu", Action::Back),
];

const STAFF: &[MenuEntry] = &[
    entry("Add Staff", Action::AddStaff),
    entry("Update Staff", Action::UpdateStaff),
    entry("Remove Staff", Action::RemoveStaff),
    entry("View Staff Details", Action::ViewStaff),
    entry("List All Staff", Action::ListStaff),
    entry("Back to Main Menu", Action::Back),
];

impl MenuId {
    pub(crate) fn title(&self) -> &'static str {
        match self {
            MenuId::Main => "Main Menu",
            MenuId::Loans => "Loan Management",
            MenuId::Books => "Book Management",
            MenuId::Members => "Member Management",
            MenuId::Staff => "Staff Management",
        }
    }

    pub(crate) fn entries(&self) -> &'static [MenuEntry] {
        match self {
            MenuId::Main => MAIN,
            MenuId::Loans => LOANS,
            MenuId::Books => BOOKS,
            MenuId::Members => MEMBERS,
            MenuId::Staff => STAFF,
        }
    }
}

/// Current menu plus the highlighted entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct MenuState {
    pub(crate) menu: MenuId,
    pub(crate) selected: usize,
}

impl MenuState {
    pub(crate) fn new(menu: MenuId) -> Self {
        Self { menu, selected: 0 }
    }

    /// Move the highlight, wrapping at both ends.
    pub(crate) fn move_selection(&mut self, offset: isize) {
        let len = self.menu.entries().len() as isize;
        if len == 0 {
            return;
        }
        self.selected = (self.selected as isize + offset).rem_euclid(len) as usize;
    }

    /// Jump to the entry shown with number `n` (1-based).
    pub(crate) fn select_number(&mut self, n: usize) -> bool {
        if n >= 1 && n <= self.menu.entries().len() {
            self.selected = n - 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn current(&self) -> &'static MenuEntry {
        &self.menu.entries()[self.selected]
    }
}
