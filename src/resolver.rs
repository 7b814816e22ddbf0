//! Assembly reference resolution.
//!
//! An [`AssemblyNameRequest`] names an assembly by simple name and optionally constrains its
//! version and strong-name token. The [`AssemblyResolver`] picks one module among the catalog's
//! candidates for that name.
//!
//! Strict resolution reports every failure as an error. Non-strict resolution never fails:
//! absent, unloadable or incompatible assemblies resolve to `None`.

use std::{fmt, str::FromStr, sync::Arc};

use crate::{
    catalog::ModuleCatalog,
    metadata::identity::{AssemblyVersion, ModuleIdentity, StrongNameToken},
    module::Module,
    Error, Result,
};

/// A reference to an assembly, as found in a referencing module or a display name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssemblyNameRequest {
    /// Simple name
    pub name: String,
    /// Minimum acceptable version
    pub version: Option<AssemblyVersion>,
    /// Culture, `None` when neutral. Informational, not used for matching.
    pub culture: Option<String>,
    /// Required strong-name token
    pub token: Option<StrongNameToken>,
}

impl AssemblyNameRequest {
    /// A request for `name` without constraints.
    #[must_use]
    pub fn new(name: &str) -> Self {
        AssemblyNameRequest {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Adds a minimum version.
    #[must_use]
    pub fn with_version(mut self, version: AssemblyVersion) -> Self {
        self.version = Some(version);
        self
    }

    /// Adds a required token.
    #[must_use]
    pub fn with_token(mut self, token: StrongNameToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Parses a display name such as
    /// `mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089`.
    ///
    /// Unknown components are ignored, `PublicKeyToken=null` means no token.
    ///
    /// # Errors
    /// Returns [`Error::Malformed`] for an empty name or an invalid version or token.
    pub fn parse(display_name: &str) -> Result<Self> {
        let mut parts = display_name.split(',').map(str::trim);

        let name = parts.next().unwrap_or_default();
        if name.is_empty() {
            return Err(malformed_error!("Assembly name cannot be empty"));
        }

        let mut request = AssemblyNameRequest::new(name);
        for part in parts {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let value = value.trim();

            match key.trim() {
                "Version" => request.version = Some(AssemblyVersion::parse(value)?),
                "Culture" => {
                    if !value.eq_ignore_ascii_case("neutral") && !value.is_empty() {
                        request.culture = Some(value.to_string());
                    }
                }
                "PublicKeyToken" => {
                    if !value.eq_ignore_ascii_case("null") && !value.is_empty() {
                        request.token = Some(value.parse()?);
                    }
                }
                _ => {}
            }
        }

        Ok(request)
    }

    /// True if `candidate` satisfies this request.
    ///
    /// Names must be equal as declared. A requested version is a lower bound. A requested token
    /// must be matched byte for byte by the candidate's token; a candidate without any token,
    /// or with an empty one, is accepted.
    #[must_use]
    pub fn is_satisfied_by(&self, candidate: &ModuleIdentity) -> bool {
        if candidate.name != self.name {
            return false;
        }

        if let Some(requested) = self.version {
            match candidate.version {
                Some(found) if found >= requested => {}
                _ => return false,
            }
        }

        match (&self.token, &candidate.token) {
            (Some(requested), Some(found)) if !found.is_empty() => {
                requested.as_bytes() == found.as_bytes()
            }
            _ => true,
        }
    }
}

impl fmt::Display for AssemblyNameRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(version) = &self.version {
            write!(f, ", Version={version}")?;
        }
        if let Some(culture) = &self.culture {
            write!(f, ", Culture={culture}")?;
        }
        if let Some(token) = &self.token {
            write!(f, ", PublicKeyToken={token}")?;
        }
        Ok(())
    }
}

impl FromStr for AssemblyNameRequest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Resolves assembly requests against a [`ModuleCatalog`].
pub struct AssemblyResolver {
    catalog: Arc<ModuleCatalog>,
    fail_on_ambiguity: bool,
}

impl AssemblyResolver {
    /// Creates a resolver. With `fail_on_ambiguity`, strict requests matched by several
    /// compatible candidates fail instead of picking the last one.
    #[must_use]
    pub fn new(catalog: Arc<ModuleCatalog>, fail_on_ambiguity: bool) -> Self {
        AssemblyResolver {
            catalog,
            fail_on_ambiguity,
        }
    }

    /// Compatibility of a candidate with a request, see
    /// [`AssemblyNameRequest::is_satisfied_by`].
    #[must_use]
    pub fn is_compatible(candidate: &ModuleIdentity, request: &AssemblyNameRequest) -> bool {
        request.is_satisfied_by(candidate)
    }

    /// Resolves a request by simple name alone.
    ///
    /// # Errors
    /// See [`AssemblyResolver::resolve`].
    pub fn resolve_simple_name(&self, name: &str, strict: bool) -> Result<Option<Arc<Module>>> {
        self.resolve(&AssemblyNameRequest::new(name), strict)
    }

    /// Picks the module satisfying `request`.
    ///
    /// A single candidate is returned as is by non-strict requests and checked by strict ones.
    /// Among several candidates only compatible ones qualify; when more than one qualifies the
    /// last one in discovery order wins.
    ///
    /// # Errors
    /// Only for `strict` requests: [`Error::NotFound`] if no candidate qualifies,
    /// [`Error::IncompatibleVersion`] if the only candidate does not match,
    /// [`Error::AmbiguousMatch`] when configured to reject ambiguity, and load errors of the
    /// candidates.
    pub fn resolve(
        &self,
        request: &AssemblyNameRequest,
        strict: bool,
    ) -> Result<Option<Arc<Module>>> {
        match self.resolve_inner(request, strict) {
            Err(error) if !strict => {
                tracing::warn!("failed to resolve {}: {}", request, error);
                Ok(None)
            }
            result => result,
        }
    }

    fn resolve_inner(
        &self,
        request: &AssemblyNameRequest,
        strict: bool,
    ) -> Result<Option<Arc<Module>>> {
        let Some(candidates) = self.catalog.candidates(&request.name)? else {
            return Self::not_found(request, strict);
        };

        if let [candidate] = candidates.as_slice() {
            if strict && !request.is_satisfied_by(candidate.identity()) {
                return Err(Error::IncompatibleVersion {
                    requested: request.to_string(),
                    found: candidate.identity().to_string(),
                });
            }
            return Ok(Some(Arc::clone(candidate)));
        }

        let compatible: Vec<&Arc<Module>> = candidates
            .iter()
            .filter(|candidate| request.is_satisfied_by(candidate.identity()))
            .collect();

        match compatible.as_slice() {
            [] => Self::not_found(request, strict),
            [single] => Ok(Some(Arc::clone(single))),
            [.., last] => {
                if strict && self.fail_on_ambiguity {
                    return Err(Error::AmbiguousMatch {
                        requested: request.to_string(),
                        candidates: compatible
                            .iter()
                            .map(|candidate| candidate.path().to_path_buf())
                            .collect(),
                    });
                }

                tracing::warn!(
                    "{} compatible candidates for {}, using {}",
                    compatible.len(),
                    request,
                    last.path().display()
                );
                Ok(Some(Arc::clone(last)))
            }
        }
    }

    fn not_found(request: &AssemblyNameRequest, strict: bool) -> Result<Option<Arc<Module>>> {
        if strict {
            Err(Error::NotFound(request.to_string()))
        } else {
            Ok(None)
        }
    }
}

impl fmt::Debug for AssemblyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssemblyResolver")
            .field("fail_on_ambiguity", &self.fail_on_ambiguity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(version: Option<[u16; 2]>, token: Option<&[u8]>) -> ModuleIdentity {
        ModuleIdentity::new(
            "A",
            version.map(|[major, minor]| AssemblyVersion::new(major, minor, 0, 0)),
            None,
            token.map(StrongNameToken::from_bytes),
        )
    }

    #[test]
    fn version_lower_bound() {
        let request = AssemblyNameRequest::new("A").with_version(AssemblyVersion::new(2, 0, 0, 0));

        assert!(!request.is_satisfied_by(&identity(Some([1, 0]), None)));
        assert!(request.is_satisfied_by(&identity(Some([2, 0]), None)));
        assert!(request.is_satisfied_by(&identity(Some([2, 1]), None)));
        assert!(!request.is_satisfied_by(&identity(None, None)));
    }

    #[test]
    fn token_rules() {
        let request = AssemblyNameRequest::new("A").with_token(StrongNameToken::from_bytes(&[0xAB, 0xCD]));

        assert!(request.is_satisfied_by(&identity(None, None)));
        assert!(request.is_satisfied_by(&identity(None, Some(&[0xAB, 0xCD]))));
        assert!(!request.is_satisfied_by(&identity(None, Some(&[0xAB, 0xCE]))));
        assert!(!request.is_satisfied_by(&identity(None, Some(&[0xAB, 0xCD, 0x00]))));
        assert!(request.is_satisfied_by(&identity(None, Some(&[]))));
    }

    #[test]
    fn name_is_case_sensitive() {
        let request = AssemblyNameRequest::new("a");
        assert!(!AssemblyResolver::is_compatible(&identity(None, None), &request));
        assert!(AssemblyResolver::is_compatible(
            &identity(None, None),
            &AssemblyNameRequest::new("A")
        ));
    }

    #[test]
    fn parse_display_name() {
        let request = AssemblyNameRequest::parse(
            "mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089",
        )
        .unwrap();

        assert_eq!(request.name, "mscorlib");
        assert_eq!(request.version, Some(AssemblyVersion::new(4, 0, 0, 0)));
        assert!(request.culture.is_none());
        assert_eq!(request.token.as_ref().unwrap().to_string(), "b77a5c561934e089");
        assert_eq!(
            request.to_string(),
            "mscorlib, Version=4.0.0.0, PublicKeyToken=b77a5c561934e089"
        );

        let request: AssemblyNameRequest = "Lib, Culture=de-DE, PublicKeyToken=null".parse().unwrap();
        assert_eq!(request.culture.as_deref(), Some("de-DE"));
        assert!(request.token.is_none());
        assert!(request.version.is_none());

        assert!(AssemblyNameRequest::parse("").is_err());
        assert!(AssemblyNameRequest::parse("Lib, Version=x").is_err());
        assert!(AssemblyNameRequest::parse("Lib, PublicKeyToken=zz").is_err());
    }
}
