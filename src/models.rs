use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

pub const FIELD_TITLE: &str = "Title";
pub const FIELD_USERNAME: &str = "UserName";
pub const FIELD_PASSWORD: &str = "Password";
pub const FIELD_URL: &str = "URL";
pub const DEFAULT_GROUP: &str = "Root";

pub fn new_uuid() -> String {
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    // set version 4 and variant bits
    bytes[6] = (bytes[6] & 0x0F) | 0x40;
    bytes[8] = (bytes[8] & 0x3F) | 0x80;
    let hex: Vec<String> = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!(
        "{}{}{}{}-{}{}-{}{}-{}{}-{}{}{}{}{}{}",
        hex[0], hex[1], hex[2], hex[3], hex[4], hex[5], hex[6], hex[7], hex[8], hex[9], hex[10],
        hex[11], hex[12], hex[13], hex[14], hex[15]
    )
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Zeroize)]
pub struct EntryValue {
    pub key: String,
    pub value: String,
}

/// A credential record: an ordered list of named values.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    #[serde(default = "new_uuid")]
    pub uuid: String,
    #[serde(default)]
    pub values: Vec<EntryValue>,
}

impl Entry {
    /// Builds an entry with exactly the four standard fields, values taken verbatim.
    pub fn with_fields(title: &str, username: &str, password: &str, url: &str) -> Self {
        let values = [
            (FIELD_TITLE, title),
            (FIELD_USERNAME, username),
            (FIELD_PASSWORD, password),
            (FIELD_URL, url),
        ]
        .into_iter()
        .map(|(key, value)| EntryValue {
            key: key.to_string(),
            value: value.to_string(),
        })
        .collect();
        Self {
            uuid: new_uuid(),
            values,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.key == key)
            .map(|v| v.value.as_str())
    }

    pub fn title(&self) -> &str {
        self.get(FIELD_TITLE).unwrap_or_default()
    }

    pub fn username(&self) -> &str {
        self.get(FIELD_USERNAME).unwrap_or_default()
    }

    pub fn password(&self) -> &str {
        self.get(FIELD_PASSWORD).unwrap_or_default()
    }

    pub fn url(&self) -> &str {
        self.get(FIELD_URL).unwrap_or_default()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Database {
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl Database {
    pub fn with_root_group() -> Self {
        Self {
            revision: 0,
            groups: vec![Group {
                name: DEFAULT_GROUP.to_string(),
                entries: Vec::new(),
            }],
        }
    }

    /// Entries of the first group; empty when the database has no groups.
    pub fn entries(&self) -> &[Entry] {
        self.groups
            .first()
            .map(|g| g.entries.as_slice())
            .unwrap_or_default()
    }

    pub fn push_entry(&mut self, entry: Entry) {
        if self.groups.is_empty() {
            self.groups.push(Group {
                name: DEFAULT_GROUP.to_string(),
                entries: Vec::new(),
            });
        }
        self.groups[0].entries.push(entry);
    }

    pub fn wipe(&mut self) {
        for group in &mut self.groups {
            for entry in &mut group.entries {
                entry.values.zeroize();
            }
            group.entries.clear();
        }
        self.groups.clear();
    }
}

#[derive(Serialize, Deserialize)]
pub struct EncryptedBlob {
    pub nonce: String,
    pub data: String,
}
