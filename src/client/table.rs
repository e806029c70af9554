use std::cmp::Ordering;

use super::{
    error::SessionResult,
    fs::{DirectoryEntry, Listing},
    session::FtpSession,
    transport::Transport,
};

/// Columns of the remote table, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Name,
    Type,
    Size,
    Modify,
}

impl Column {
    pub const ALL: [Self; 4] = [Self::Name, Self::Type, Self::Size, Self::Modify];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Type => "type",
            Self::Size => "size",
            Self::Modify => "modify",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Ascending,
    Descending,
}

/// Rows of the current remote directory as a table view consumes them.
///
/// Missing facts render as empty cells. Rows keep the server order until
/// [`RemoteTable::sort`] is called.
#[derive(Debug, Clone, Default)]
pub struct RemoteTable {
    rows: Vec<DirectoryEntry>,
    sorting: Option<(Column, Order)>,
}

impl RemoteTable {
    pub fn from_listing(listing: Listing) -> Self {
        Self {
            rows: listing.into_iter().collect(),
            sorting: None,
        }
    }

    /// Lists the session's current directory
    pub async fn load<T: Transport>(session: &mut FtpSession<T>) -> SessionResult<Self> {
        Ok(Self::from_listing(session.list().await?))
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        Column::ALL.len()
    }

    /// Entry behind a row, used to turn a selection into downloads
    pub fn entry(&self, row: usize) -> Option<&DirectoryEntry> {
        self.rows.get(row)
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.rows
    }

    pub fn cell(&self, row: usize, column: Column) -> Option<String> {
        self.rows.get(row).map(|entry| display(entry, column))
    }

    /// Sorts rows by one column. Sizes compare numerically, other columns by
    /// their displayed text. The sort is stable.
    pub fn sort(&mut self, column: Column, order: Order) {
        self.rows.sort_by(|a, b| {
            let ordering = compare(a, b, column);
            match order {
                Order::Ascending => ordering,
                Order::Descending => ordering.reverse(),
            }
        });
        self.sorting = Some((column, order));
    }

    /// Re-lists the session's current directory, keeping the last sort.
    /// On failure the previous rows stay in place.
    pub async fn refresh<T: Transport>(&mut self, session: &mut FtpSession<T>) -> SessionResult<()> {
        self.rows = session.list().await?.into_iter().collect();
        if let Some((column, order)) = self.sorting {
            self.sort(column, order);
        }
        Ok(())
    }
}

fn display(entry: &DirectoryEntry, column: Column) -> String {
    match column {
        Column::Name => entry.name.clone(),
        Column::Type => entry.kind.to_string(),
        Column::Size => entry.size.map(|s| s.to_string()).unwrap_or_default(),
        Column::Modify => entry.modify.clone().unwrap_or_default(),
    }
}

fn compare(a: &DirectoryEntry, b: &DirectoryEntry, column: Column) -> Ordering {
    match column {
        Column::Size => a.size.cmp(&b.size),
        column => display(a, column).cmp(&display(b, column)),
    }
}
