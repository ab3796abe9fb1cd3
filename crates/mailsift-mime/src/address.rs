//! RFC 5322 address list parsing (`From`, `To`, `Cc`, ...).

use crate::encoding::decode_encoded_words;
use std::str::Chars;

/// A single mailbox.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Address {
    /// Decoded display name, empty if none was given.
    pub name: String,
    /// Address in `local@domain` form.
    pub email: String,
}

impl Address {
    /// Creates a new address.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// A named group of mailboxes (`Team: a@x.com, b@x.com;`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Group {
    /// Decoded group name.
    pub name: String,
    /// Members in declaration order. May be empty.
    pub members: Vec<Address>,
}

/// One entry of an address list.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(untagged))]
pub enum AddressListEntry {
    /// A single mailbox.
    Address(Address),
    /// A group of mailboxes.
    Group(Group),
}

impl AddressListEntry {
    /// Returns the mailboxes of this entry: itself, or the group members.
    #[must_use]
    pub fn mailboxes(&self) -> &[Address] {
        match self {
            Self::Address(address) => std::slice::from_ref(address),
            Self::Group(group) => &group.members,
        }
    }
}

/// The mailbox being accumulated between separators.
#[derive(Default)]
struct PendingAddress {
    /// Display-name words (atoms, quoted strings, encoded words).
    words: Vec<String>,
    /// Word currently being read.
    atom: String,
    /// Raw text without whitespace or comments, used for bare addresses.
    addr_spec: String,
    /// Content of an `<...>` angle address.
    angle: Option<String>,
    /// First comment seen.
    comment: Option<String>,
}

impl PendingAddress {
    fn end_word(&mut self) {
        if !self.atom.is_empty() {
            self.words.push(std::mem::take(&mut self.atom));
        }
    }

    fn phrase(&mut self) -> String {
        self.end_word();
        decode_encoded_words(&self.words.join(" ")).trim().to_string()
    }

    fn into_address(mut self) -> Option<Address> {
        let comment_name = self.comment.take().map(|c| decode_encoded_words(c.trim()));
        if let Some(email) = self.angle.take() {
            let name = self.phrase();
            let name = if name.is_empty() {
                comment_name.unwrap_or_default()
            } else {
                name
            };
            return Some(Address::new(name, email.trim()));
        }

        // A phrase followed by a bare address (`Some One someone@test.com`)
        self.end_word();
        let trailing_address = self.words.len() > 1
            && self
                .words
                .last()
                .is_some_and(|word| word.contains('@') && !word.starts_with('@'));
        if trailing_address {
            let email = self.words.pop().unwrap_or_default();
            let name = self.phrase();
            return Some(Address::new(name, email));
        }

        if self.addr_spec.is_empty() {
            return None;
        }
        Some(Address::new(comment_name.unwrap_or_default(), self.addr_spec))
    }
}

/// Parses an address list header value.
///
/// Entries are mailboxes (`Name <local@domain>`, `local@domain`) or groups
/// (`Name: mailbox, mailbox;`). Display names may be quoted strings or
/// RFC 2047 encoded words and are returned decoded. Comments are skipped,
/// except that a comment supplies the name of a mailbox that has none.
/// Entry order and member order follow the header. An unterminated group is
/// closed at the end of input.
#[must_use]
pub fn parse_address_list(raw: &str) -> Vec<AddressListEntry> {
    let mut entries = Vec::new();
    let mut group: Option<Group> = None;
    let mut pending = PendingAddress::default();
    let mut chars = raw.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                pending.end_word();
                let quoted = read_quoted(&mut chars);
                pending.addr_spec.push('"');
                pending.addr_spec.push_str(&quoted);
                pending.addr_spec.push('"');
                pending.words.push(quoted);
            }
            '(' => {
                pending.end_word();
                let comment = read_comment(&mut chars);
                pending.comment.get_or_insert(comment);
            }
            '<' => {
                pending.end_word();
                pending.angle = Some(read_angle(&mut chars));
            }
            ',' => finish_address(std::mem::take(&mut pending), group.as_mut(), &mut entries),
            ':' if group.is_none() => {
                let name = pending.phrase();
                group = Some(Group {
                    name,
                    members: Vec::new(),
                });
                pending = PendingAddress::default();
            }
            ';' => {
                finish_address(std::mem::take(&mut pending), group.as_mut(), &mut entries);
                if let Some(group) = group.take() {
                    entries.push(AddressListEntry::Group(group));
                }
            }
            c if c.is_whitespace() => pending.end_word(),
            c => {
                pending.atom.push(c);
                pending.addr_spec.push(c);
            }
        }
    }

    finish_address(pending, group.as_mut(), &mut entries);
    if let Some(group) = group {
        entries.push(AddressListEntry::Group(group));
    }

    entries
}

fn finish_address(pending: PendingAddress, group: Option<&mut Group>, entries: &mut Vec<AddressListEntry>) {
    let Some(address) = pending.into_address() else {
        return;
    };
    match group {
        Some(group) => group.members.push(address),
        None => entries.push(AddressListEntry::Address(address)),
    }
}

/// Reads a quoted string after its opening quote, resolving escapes.
fn read_quoted(chars: &mut Chars<'_>) -> String {
    let mut result = String::new();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(next) = chars.next() {
                    result.push(next);
                }
            }
            '"' => break,
            '\r' | '\n' => {}
            _ => result.push(ch),
        }
    }
    result
}

/// Reads a (possibly nested) comment after its opening parenthesis.
fn read_comment(chars: &mut Chars<'_>) -> String {
    let mut result = String::new();
    let mut depth = 1;
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(next) = chars.next() {
                    result.push(next);
                }
            }
            '(' => {
                depth += 1;
                result.push(ch);
            }
            ')' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
                result.push(ch);
            }
            _ => result.push(ch),
        }
    }
    result
}

/// Reads an angle address after its `<`, dropping whitespace and comments.
fn read_angle(chars: &mut Chars<'_>) -> String {
    let mut result = String::new();
    while let Some(ch) = chars.next() {
        match ch {
            '>' => break,
            '(' => {
                read_comment(chars);
            }
            '"' => {
                result.push('"');
                result.push_str(&read_quoted(chars));
                result.push('"');
            }
            c if c.is_whitespace() => {}
            _ => result.push(ch),
        }
    }
    result
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn address(name: &str, email: &str) -> AddressListEntry {
        AddressListEntry::Address(Address::new(name, email))
    }

    #[test]
    fn test_bare_addresses() {
        assert_eq!(
            parse_address_list("receiver@test.com, another_receiver@test.com"),
            vec![
                address("", "receiver@test.com"),
                address("", "another_receiver@test.com")
            ]
        );
    }

    #[test]
    fn test_display_names() {
        assert_eq!(
            parse_address_list("Some One <someone@test.com>"),
            vec![address("Some One", "someone@test.com")]
        );
        assert_eq!(
            parse_address_list("\"Doe, John\" <john@example.com>, <bare@example.com>"),
            vec![
                address("Doe, John", "john@example.com"),
                address("", "bare@example.com")
            ]
        );
    }

    #[test]
    fn test_encoded_display_name() {
        assert_eq!(
            parse_address_list("=?ISO-8859-1?Q?Keld_J=F8rn?= =?ISO-8859-1?Q?_Simonsen?= <keld@dkuug.dk>"),
            vec![address("Keld Jørn Simonsen", "keld@dkuug.dk")]
        );
        assert_eq!(
            parse_address_list("\"=?utf-8?B?w6lsw6h2ZQ==?=\" <student@example.com>"),
            vec![address("élève", "student@example.com")]
        );
    }

    #[test]
    fn test_groups() {
        assert_eq!(
            parse_address_list("Group A: AA <a@b.com>, AB <a@b.com>; Group B: <b@b.com>;"),
            vec![
                AddressListEntry::Group(Group {
                    name: "Group A".to_string(),
                    members: vec![Address::new("AA", "a@b.com"), Address::new("AB", "a@b.com")],
                }),
                AddressListEntry::Group(Group {
                    name: "Group B".to_string(),
                    members: vec![Address::new("", "b@b.com")],
                }),
            ]
        );
    }

    #[test]
    fn test_empty_group() {
        assert_eq!(
            parse_address_list("undisclosed-recipients:;"),
            vec![AddressListEntry::Group(Group {
                name: "undisclosed-recipients".to_string(),
                members: Vec::new(),
            })]
        );
    }

    #[test]
    fn test_mixed_group_and_addresses() {
        let entries = parse_address_list("a@x.com, Team: b@x.com, c@x.com; d@x.com");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], address("", "a@x.com"));
        assert_eq!(entries[1].mailboxes().len(), 2);
        assert_eq!(entries[2], address("", "d@x.com"));
    }

    #[test]
    fn test_unterminated_group() {
        let entries = parse_address_list("Team: b@x.com");
        assert_eq!(
            entries,
            vec![AddressListEntry::Group(Group {
                name: "Team".to_string(),
                members: vec![Address::new("", "b@x.com")],
            })]
        );
    }

    #[test]
    fn test_comments_and_folding() {
        assert_eq!(
            parse_address_list("john@example.com (John Doe)"),
            vec![address("John Doe", "john@example.com")]
        );
        assert_eq!(
            parse_address_list("Pete(A nice \\) chap) <pete(his account)@silly.test(his host)>"),
            vec![address("Pete", "pete@silly.test")]
        );
        assert_eq!(
            parse_address_list("Mary\r\n Smith\r\n <mary@x.test>,\r\n jdoe@example.org"),
            vec![address("Mary Smith", "mary@x.test"), address("", "jdoe@example.org")]
        );
    }

    #[test]
    fn test_phrase_before_bare_address() {
        assert_eq!(
            parse_address_list("Some One someone@test.com, \"Doe, J\" jd@test.com"),
            vec![address("Some One", "someone@test.com"), address("Doe, J", "jd@test.com")]
        );
        // Quoted local parts and folded addr-specs stay whole
        assert_eq!(
            parse_address_list("\"john doe\"@example.com"),
            vec![address("", "\"john doe\"@example.com")]
        );
        assert_eq!(
            parse_address_list("john @ example.com"),
            vec![address("", "john@example.com")]
        );
    }

    #[test]
    fn test_empty_and_stray_separators() {
        assert!(parse_address_list("").is_empty());
        assert!(parse_address_list("  , ,").is_empty());
        assert_eq!(parse_address_list(",a@b.com,"), vec![address("", "a@b.com")]);
    }

    proptest! {
        #[test]
        fn parse_never_panics(s in "[a-zA-Z@.,:;<>\"()\\\\ =?_-]{0,60}") {
            let _ = parse_address_list(&s);
        }
    }
}
