//! Identity of a loaded module: simple name, version, culture and strong-name token.
//!
//! Assemblies carry their identity in the `Assembly` table (0x20). Netmodules have no
//! manifest, their identity is the name of the `Module` row with neither version nor token.
//!
//! # Example
//! ```rust
//! use dotbind::metadata::identity::{AssemblyVersion, StrongNameToken};
//!
//! let version = AssemblyVersion::parse("4.0")?;
//! assert_eq!(version.to_string(), "4.0.0.0");
//!
//! let token: StrongNameToken = "b77a5c561934e089".parse()?;
//! assert_eq!(token.as_bytes()[0], 0xB7);
//! # Ok::<(), dotbind::Error>(())
//! ```

use std::{fmt, str::FromStr};

use bitflags::bitflags;
use sha1::{Digest, Sha1};

use crate::{
    metadata::{
        streams::{Blob, Strings, TablesHeader},
        tables::{AssemblyRaw, ModuleRaw},
    },
    Error, Result,
};

/// Length of a public key token in bytes.
pub const TOKEN_LEN: usize = 8;

bitflags! {
    /// `AssemblyFlags`, ECMA-335 II.23.1.2
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AssemblyFlags: u32 {
        /// The assembly reference holds the full (unhashed) public key
        const PUBLIC_KEY = 0x0001;
        /// The implementation of this assembly used at runtime is not expected to match the version seen at compile time
        const RETARGETABLE = 0x0100;
        /// Reserved, JIT tracking disabled
        const DISABLE_JIT_COMPILE_OPTIMIZER = 0x4000;
        /// Reserved, JIT tracking enabled
        const ENABLE_JIT_COMPILE_TRACKING = 0x8000;
    }
}

/// A four-part assembly version, ordered lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AssemblyVersion {
    /// Major component
    pub major: u16,
    /// Minor component
    pub minor: u16,
    /// Build component
    pub build: u16,
    /// Revision component
    pub revision: u16,
}

impl AssemblyVersion {
    /// Creates a version from its four components.
    #[must_use]
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        AssemblyVersion {
            major,
            minor,
            build,
            revision,
        }
    }

    /// Parses `major[.minor[.build[.revision]]]`, missing components are zero.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for more than four components or components that
    /// are not `u16`.
    pub fn parse(version_str: &str) -> Result<Self> {
        let parts: Vec<&str> = version_str.trim().split('.').collect();
        if parts.len() > 4 {
            return Err(malformed_error!("Invalid version format: {}", version_str));
        }

        let mut components = [0u16; 4];
        for (i, part) in parts.iter().enumerate() {
            components[i] = part
                .parse::<u16>()
                .map_err(|_| malformed_error!("Invalid version component: {}", part))?;
        }

        Ok(Self::new(
            components[0],
            components[1],
            components[2],
            components[3],
        ))
    }
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

impl FromStr for AssemblyVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// The strong-name identity token of an assembly, kept as the raw byte sequence.
///
/// Tokens computed from a public key are always [`TOKEN_LEN`] bytes. Tokens supplied by a
/// request are taken as given, so a constraint may carry a token of a different length and
/// simply never match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StrongNameToken(Vec<u8>);

impl StrongNameToken {
    /// Computes the token of a public key: the last 8 bytes of its SHA-1 digest, reversed.
    #[must_use]
    pub fn from_public_key(public_key: &[u8]) -> Self {
        let digest = Sha1::digest(public_key);
        let token = digest[digest.len() - TOKEN_LEN..].iter().rev().copied().collect();
        StrongNameToken(token)
    }

    /// Wraps token bytes as they appear in a display name.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        StrongNameToken(bytes.to_vec())
    }

    /// Token bytes, in display order.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// True for a zero-length token.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for StrongNameToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl FromStr for StrongNameToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| malformed_error!("Invalid hex in PublicKeyToken '{}': {}", s, e))?;
        Ok(StrongNameToken(bytes))
    }
}

/// The identity a module declares about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleIdentity {
    /// Declared simple name, case preserved
    pub name: String,
    /// Assembly version, `None` for modules without a manifest
    pub version: Option<AssemblyVersion>,
    /// Culture, `None` when neutral
    pub culture: Option<String>,
    /// Strong-name token, `None` when unsigned
    pub token: Option<StrongNameToken>,
    /// Assembly flags, empty for modules without a manifest
    pub flags: AssemblyFlags,
}

impl ModuleIdentity {
    /// Creates an identity from its parts.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: Option<AssemblyVersion>,
        culture: Option<String>,
        token: Option<StrongNameToken>,
    ) -> Self {
        ModuleIdentity {
            name: name.into(),
            version,
            culture,
            token,
            flags: AssemblyFlags::empty(),
        }
    }

    /// Extracts the identity from parsed table and heap data.
    ///
    /// # Errors
    /// Returns an error if the `Module` row is missing or a heap index is invalid.
    pub fn read(tables: &TablesHeader, strings: &Strings, blobs: Option<&Blob>) -> Result<Self> {
        match tables.assembly()? {
            Some(assembly) => Self::from_assembly(&assembly, strings, blobs),
            None => Self::from_module(&tables.module()?, strings),
        }
    }

    fn from_assembly(row: &AssemblyRaw, strings: &Strings, blobs: Option<&Blob>) -> Result<Self> {
        let name = strings.get(row.name as usize)?.to_string();

        let culture = match strings.get(row.culture as usize)? {
            "" | "neutral" => None,
            culture => Some(culture.to_string()),
        };

        let public_key = match blobs {
            Some(blobs) if row.public_key != 0 => blobs.get(row.public_key as usize)?,
            _ => &[],
        };
        let token = if public_key.is_empty() {
            None
        } else {
            Some(StrongNameToken::from_public_key(public_key))
        };

        Ok(ModuleIdentity {
            name,
            version: Some(AssemblyVersion::new(
                row.major_version,
                row.minor_version,
                row.build_number,
                row.revision_number,
            )),
            culture,
            token,
            flags: AssemblyFlags::from_bits_retain(row.flags),
        })
    }

    fn from_module(row: &ModuleRaw, strings: &Strings) -> Result<Self> {
        let name = strings.get(row.name as usize)?;
        let name = name
            .strip_suffix(".netmodule")
            .or_else(|| name.strip_suffix(".dll"))
            .unwrap_or(name);

        Ok(ModuleIdentity::new(name, None, None, None))
    }
}

impl fmt::Display for ModuleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(version) = &self.version {
            write!(f, ", Version={version}")?;
        }
        write!(
            f,
            ", Culture={}",
            self.culture.as_deref().unwrap_or("neutral")
        )?;
        match &self.token {
            Some(token) => write!(f, ", PublicKeyToken={token}"),
            None => write!(f, ", PublicKeyToken=null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The ECMA standard public key, its token is `b77a5c561934e089`.
    const ECMA_KEY: [u8; 16] = [0, 0, 0, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0];

    #[test]
    fn version_parse() {
        assert_eq!(
            AssemblyVersion::parse("1.2.3.4").unwrap(),
            AssemblyVersion::new(1, 2, 3, 4)
        );
        assert_eq!(
            AssemblyVersion::parse("2").unwrap(),
            AssemblyVersion::new(2, 0, 0, 0)
        );
        assert!(AssemblyVersion::parse("1.2.3.4.5").is_err());
        assert!(AssemblyVersion::parse("1.x").is_err());
        assert!(AssemblyVersion::parse("70000").is_err());
    }

    #[test]
    fn version_ordering() {
        let v1_0 = AssemblyVersion::new(1, 0, 0, 0);
        let v2_0 = AssemblyVersion::new(2, 0, 0, 0);
        let v2_1 = AssemblyVersion::new(2, 1, 0, 0);

        assert!(v1_0 < v2_0);
        assert!(v2_1 >= v2_0);
        assert!(AssemblyVersion::new(1, 9, 9, 9) < AssemblyVersion::new(2, 0, 0, 0));
    }

    #[test]
    fn ecma_token() {
        let token = StrongNameToken::from_public_key(&ECMA_KEY);
        assert_eq!(token.to_string(), "b77a5c561934e089");
        assert_eq!(token, "B77A5C561934E089".parse().unwrap());
    }

    #[test]
    fn token_parse() {
        let token: StrongNameToken = "abcd".parse().unwrap();
        assert_eq!(token.as_bytes(), &[0xAB, 0xCD]);
        assert!("xyz".parse::<StrongNameToken>().is_err());
    }

    #[test]
    fn display() {
        let identity = ModuleIdentity::new(
            "System.Runtime",
            Some(AssemblyVersion::new(8, 0, 0, 0)),
            None,
            Some(StrongNameToken::from_public_key(&ECMA_KEY)),
        );
        assert_eq!(
            identity.to_string(),
            "System.Runtime, Version=8.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089"
        );

        let netmodule = ModuleIdentity::new("Part", None, Some("de-DE".to_string()), None);
        assert_eq!(netmodule.to_string(), "Part, Culture=de-DE, PublicKeyToken=null");
    }
}
