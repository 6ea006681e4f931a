//!  Slotscout Facility Client
//!
//!  Copyright (C) 2026  Mamy Ratsimbazafy
//!
//!  This program is free software: you can redistribute it and/or modify
//!  it under the terms of the GNU Affero General Public License as published by
//!  the Free Software Foundation, either version 3 of the License, or
//!  (at your option) any later version.
//!
//!  This program is distributed in the hope that it will be useful,
//!  but WITHOUT ANY WARRANTY; without even the implied warranty of
//!  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//!  GNU Affero General Public License for more details.
//!
//!  You should have received a copy of the GNU Affero General Public License
//!  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Session cookies harvested from the reservation site.

use std::collections::BTreeMap;

/// Cookie name to value for one backend session. Replaced wholesale, never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cookies.keys().map(String::as_str)
    }

    /// Value of the `Cookie` request header: `a=1; b=2`, in name order.
    ///
    /// `None` for an empty jar so the header can be left off entirely.
    pub fn to_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let header = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");
        Some(header)
    }
}

impl<N, V> FromIterator<(N, V)> for CookieJar
where
    N: Into<String>,
    V: Into<String>,
{
    /// Later duplicates of a name win, matching what a browser would send last.
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            cookies: iter
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .filter(|(n, _)| !n.is_empty())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_name_ordered() {
        let jar: CookieJar = [("JSESSIONID", "abc"), ("AWSALB", "xyz"), ("locale", "en-US")]
            .into_iter()
            .collect();
        assert_eq!(
            jar.to_header().as_deref(),
            Some("AWSALB=xyz; JSESSIONID=abc; locale=en-US")
        );
        assert_eq!(jar.len(), 3);
        assert_eq!(jar.get("JSESSIONID"), Some("abc"));
    }

    #[test]
    fn empty_jar_has_no_header() {
        assert_eq!(CookieJar::new().to_header(), None);
    }

    #[test]
    fn duplicate_names_keep_last_and_blank_names_dropped() {
        let jar: CookieJar = [("a", "1"), ("", "ghost"), ("a", "2")].into_iter().collect();
        assert_eq!(jar.len(), 1);
        assert_eq!(jar.get("a"), Some("2"));
    }
}
