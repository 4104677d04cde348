//! Ingress activation
//!
//! Every `ingress` mapping of the document is enabled and pointed at a
//! hostname derived from the module name and the cluster domain. Two layouts
//! of `hosts` are supported:
//!
//! ```yaml
//! hosts:            # HostsShape::Strings
//!   - chart-example.local
//!
//! hosts:            # HostsShape::Objects
//!   - name: chart-example.local
//!     path: /
//!     tls: false
//!     tlsSecret: chart-example-tls
//! ```
//!
//! Documents matching neither layout, or missing a companion key, are left
//! untouched.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping, Value as YamlValue};

use super::{
    body, comment_out, inline_value, pad, set_scalar, terminated, uncommented_content,
    uncommented_indent, RewriteOutcome, ValuesFilter,
};
use crate::config::KubernetesConfig;
use crate::document::ValuesDocument;
use crate::indent::{is_blank, is_comment, leading_spaces};
use crate::structure::StructurePath;

static ENABLED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*enabled:").unwrap());
static CERT_MANAGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*certManager:").unwrap());
static HOSTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*hosts:").unwrap());
static TLS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*tls:").unwrap());
static ANNOTATIONS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*annotations:").unwrap());
static COMMENTED_ANNOTATIONS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*#+\s*annotations:\s*(\{\s*\})?\s*$").unwrap());
static COMMENTED_KEY_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*#+\s*[0-9A-Za-z_./\-]+:\s+\S").unwrap());

static HOST_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(-\s+)?name:").unwrap());
static HOST_TLS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(-\s+)?tls:").unwrap());
static HOST_TLS_SECRET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(-\s+)?tlsSecret:").unwrap());
static HOST_TLS_HOSTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(-\s+)?tlsHosts:").unwrap());

const DEFAULT_ANNOTATIONS: &[(&str, &str)] = &[
    ("kubernetes.io/ingress.class", "nginx"),
    ("kubernetes.io/tls-acme", "'true'"),
];

const STRING_HOSTS_KEYS: &[&str] = &["enabled", "path", "annotations", "tls"];
const OBJECT_HOSTS_KEYS: &[&str] = &["enabled", "certManager"];
const OBJECT_HOST_ENTRY_KEYS: &[&str] = &["name", "path", "tls", "tlsSecret"];

/// Layout of an ingress `hosts` value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostsShape {
    /// Null or a list of hostname strings
    Strings,
    /// A non-empty list of host mappings
    Objects,
}

impl HostsShape {
    /// Shape shared by every ingress, if any
    pub fn detect<'v>(specs: impl IntoIterator<Item = &'v Mapping>) -> Option<Self> {
        let hosts: Vec<Option<&YamlValue>> = specs.into_iter().map(|m| m.get("hosts")).collect();
        if hosts.is_empty() || hosts.iter().any(Option::is_none) {
            return None;
        }
        let hosts: Vec<&YamlValue> = hosts.into_iter().flatten().collect();

        let strings = hosts.iter().all(|h| match h {
            YamlValue::Null => true,
            YamlValue::Sequence(seq) => seq.iter().all(YamlValue::is_string),
            _ => false,
        });
        if strings {
            return Some(Self::Strings);
        }

        let objects = hosts.iter().all(|h| match h {
            YamlValue::Sequence(seq) => !seq.is_empty() && seq.iter().all(YamlValue::is_mapping),
            _ => false,
        });
        objects.then_some(Self::Objects)
    }

    fn has_companion_keys(self, spec: &Mapping) -> bool {
        match self {
            Self::Strings => STRING_HOSTS_KEYS.iter().all(|k| spec.contains_key(*k)),
            Self::Objects => {
                let entries_ok = spec
                    .get("hosts")
                    .and_then(YamlValue::as_sequence)
                    .is_some_and(|seq| {
                        seq.iter().filter_map(YamlValue::as_mapping).all(|entry| {
                            OBJECT_HOST_ENTRY_KEYS.iter().all(|k| entry.contains_key(*k))
                        })
                    });
                entries_ok && OBJECT_HOSTS_KEYS.iter().all(|k| spec.contains_key(*k))
            }
        }
    }
}

/// One `ingress` mapping of the document
#[derive(Debug)]
struct IngressSite {
    /// Path of lines directly inside the ingress mapping
    path: StructurePath,
    hostname: String,
    spec: Mapping,
}

pub struct IngressRewriter<'a> {
    module_name: &'a str,
    config: &'a KubernetesConfig,
}

impl<'a> IngressRewriter<'a> {
    pub fn new(module_name: &'a str, config: &'a KubernetesConfig) -> Self {
        Self {
            module_name,
            config,
        }
    }

    /// Hostname for the ingress whose own path is `ingress_path`
    ///
    /// `_.ingress` gives `<module>.<domain>`; `_.server.ingress` gives
    /// `server.<module>.<domain>`.
    pub fn hostname_for(&self, ingress_path: &StructurePath) -> String {
        let mut parts: Vec<&str> = ingress_path
            .intermediate()
            .iter()
            .map(String::as_str)
            .collect();
        parts.push(self.module_name);
        parts.push(&self.config.common_domain);
        parts.join(".")
    }

    fn sites(&self, doc: &ValuesDocument) -> Option<(HostsShape, Vec<IngressSite>)> {
        let values = match doc.parse_values() {
            Ok(values) => values,
            Err(e) => {
                tracing::debug!(error = %e, "values do not parse; ingress left untouched");
                return None;
            }
        };

        let found = values.find_key_all("ingress");
        if found.is_empty() {
            return None;
        }

        let mut sites = Vec::with_capacity(found.len());
        for (parent, spec) in found {
            let Some(spec) = spec.as_mapping() else {
                tracing::debug!(parent = %parent, "ingress is not a mapping; left untouched");
                return None;
            };
            let path = StructurePath::from(format!("{parent}.ingress").as_str());
            sites.push(IngressSite {
                hostname: self.hostname_for(&path),
                path,
                spec: spec.clone(),
            });
        }

        let Some(shape) = HostsShape::detect(sites.iter().map(|s| &s.spec)) else {
            tracing::debug!("ingress hosts layout not recognized; left untouched");
            return None;
        };
        if let Some(site) = sites.iter().find(|s| !shape.has_companion_keys(&s.spec)) {
            tracing::debug!(path = %site.path, ?shape, "ingress lacks expected keys; left untouched");
            return None;
        }
        Some((shape, sites))
    }
}

impl ValuesFilter for IngressRewriter<'_> {
    fn name(&self) -> &'static str {
        "ingress"
    }

    fn filter(&self, doc: &ValuesDocument) -> RewriteOutcome {
        let Some((shape, sites)) = self.sites(doc) else {
            return RewriteOutcome::unchanged(doc);
        };

        let mut session = EditSession {
            work: doc.clone(),
            unit: doc.indent_unit(),
            shape,
            config: self.config,
        };

        let mut i = 0;
        while i < session.work.len() {
            let site = session
                .work
                .path(i)
                .and_then(|path| sites.iter().find(|s| s.path == *path));
            i = match site {
                Some(site) => session.edit_at(i, site),
                None => i + 1,
            };
        }

        RewriteOutcome::new(doc, session.work.to_text())
    }
}

/// Mutable state of one rewrite; every edit re-derives the document indexes
struct EditSession<'c> {
    work: ValuesDocument,
    unit: usize,
    shape: HostsShape,
    config: &'c KubernetesConfig,
}

impl EditSession<'_> {
    fn line(&self, index: usize) -> String {
        self.work.line(index).unwrap_or_default().to_string()
    }

    /// Edit the line at `i` and return the index of the next unvisited line
    fn edit_at(&mut self, i: usize, site: &IngressSite) -> usize {
        let line = self.line(i);

        if self.work.indent(i).is_none() {
            if COMMENTED_ANNOTATIONS.is_match(&line) && !site.spec.contains_key("annotations") {
                return self.rewrite_annotations(i, site, true);
            }
            return i + 1;
        }

        if ENABLED.is_match(&line)
            || (self.shape == HostsShape::Objects && CERT_MANAGER.is_match(&line))
        {
            self.work.replace_line(i, set_scalar(&line, "true"));
            return i + 1;
        }
        if HOSTS.is_match(&line) {
            return match self.shape {
                HostsShape::Strings => self.rewrite_string_hosts(i, site),
                HostsShape::Objects => self.rewrite_object_hosts(i, site),
            };
        }
        if self.shape == HostsShape::Strings && TLS.is_match(&line) {
            return self.rewrite_tls(i, site);
        }
        if ANNOTATIONS.is_match(&line) {
            return self.rewrite_annotations(i, site, false);
        }
        i + 1
    }

    /// End of the list block that starts at `start` below a key at `indent`
    ///
    /// Comment lines are part of the block only when list content follows
    /// them.
    fn list_block_end(&self, start: usize, indent: usize) -> usize {
        let mut end = start;
        let mut j = start;
        while let Some(line) = self.work.line(j) {
            if self.work.indent(j).is_some() || is_blank(line) {
                break;
            }
            j += 1;
            if is_comment(line) {
                continue;
            }
            let lead = leading_spaces(line);
            if lead > indent || (lead == indent && line.trim_start().starts_with('-')) {
                end = j;
            } else {
                break;
            }
        }
        end
    }

    fn rewrite_string_hosts(&mut self, i: usize, site: &IngressSite) -> usize {
        let line = self.line(i);
        let indent = leading_spaces(&line);
        let end = self.list_block_end(i + 1, indent);

        let active: Vec<&str> = site
            .spec
            .get("hosts")
            .and_then(YamlValue::as_sequence)
            .map(|seq| seq.iter().filter_map(YamlValue::as_str).collect())
            .unwrap_or_default();
        if active == [site.hostname.as_str()] {
            return end;
        }

        let mut lines = Vec::new();
        match inline_value(&line) {
            "" => lines.push(terminated(&line)),
            "[]" | "~" | "null" => lines.push(format!("{}hosts:\n", pad(indent))),
            _ => {
                lines.push(comment_out(&line));
                lines.push(format!("{}hosts:\n", pad(indent)));
            }
        }
        for j in i + 1..end {
            let entry = self.line(j);
            lines.push(if is_comment(&entry) {
                terminated(&entry)
            } else {
                comment_out(&entry)
            });
        }
        lines.push(format!("{}- {}\n", pad(indent + self.unit), site.hostname));

        tracing::debug!(path = %site.path, hostname = %site.hostname, "ingress hosts replaced");
        let next = i + lines.len();
        self.work.splice_lines(i..end, lines);
        next
    }

    fn rewrite_object_hosts(&mut self, i: usize, site: &IngressSite) -> usize {
        let indent = leading_spaces(&self.line(i));
        let end = self.list_block_end(i + 1, indent);

        let mut block = Vec::new();
        let mut j = i + 1;
        while j < end {
            let line = self.line(j);
            if is_comment(&line) {
                block.push(terminated(&line));
            } else if HOST_NAME.is_match(&line) {
                block.push(set_scalar(&line, &site.hostname));
            } else if HOST_TLS.is_match(&line) {
                block.push(set_scalar(&line, "true"));
            } else if HOST_TLS_SECRET.is_match(&line) {
                block.push(set_scalar(&line, &self.config.common_cert));
            } else if HOST_TLS_HOSTS.is_match(&line) {
                j = self.rewrite_tls_hosts(j, end, site, &mut block);
                continue;
            } else {
                block.push(line);
            }
            j += 1;
        }

        let next = i + 1 + block.len();
        self.work.splice_lines(i + 1..end, block);
        next
    }

    /// Append the rewritten `tlsHosts` key at `j` and its list to `block`
    fn rewrite_tls_hosts(
        &self,
        j: usize,
        limit: usize,
        site: &IngressSite,
        block: &mut Vec<String>,
    ) -> usize {
        let line = self.line(j);
        let key_col = body(&line).find("tlsHosts").unwrap_or(0);
        let end = self.list_block_end(j + 1, key_col).min(limit);

        let items: Vec<String> = (j + 1..end).map(|k| self.line(k)).collect();
        let active: Vec<&str> = items
            .iter()
            .filter(|l| !is_comment(l))
            .map(|l| {
                l.trim()
                    .trim_start_matches('-')
                    .trim()
                    .trim_matches(|c| c == '"' || c == '\'')
            })
            .collect();

        let inline = inline_value(&line);
        if inline.is_empty() && active == [site.hostname.as_str()] {
            block.push(line);
            block.extend(items);
            return end;
        }

        let header = format!("{}tlsHosts:\n", &body(&line)[..key_col]);
        match inline {
            "" => block.push(line.clone()),
            "[]" | "~" | "null" => block.push(header),
            _ => {
                block.push(comment_out(&line));
                block.push(header);
            }
        }
        for item in items {
            block.push(if is_comment(&item) {
                terminated(&item)
            } else {
                comment_out(&item)
            });
        }
        block.push(format!("{}- {}\n", pad(key_col + self.unit), site.hostname));
        end
    }

    fn rewrite_tls(&mut self, i: usize, site: &IngressSite) -> usize {
        let line = self.line(i);
        let indent = leading_spaces(&line);
        let end = self.list_block_end(i + 1, indent);

        let empty = match site.spec.get("tls") {
            None | Some(YamlValue::Null) => true,
            Some(YamlValue::Sequence(seq)) => seq.is_empty(),
            Some(_) => false,
        };
        if !empty {
            return end;
        }

        let header = if inline_value(&line).is_empty() {
            terminated(&line)
        } else {
            format!("{}tls:\n", pad(indent))
        };
        let item = pad(indent + self.unit);
        let lines = vec![
            header,
            format!("{item}- hosts:\n"),
            format!("{item}  - '*.{}'\n", self.config.common_domain),
            format!("{item}  secretName: {}\n", self.config.common_cert),
        ];

        let next = i + lines.len();
        self.work.splice_lines(i..i + 1, lines);
        next
    }

    /// Column of keys directly inside the ingress mapping
    fn child_indent(&self, site: &IngressSite) -> Option<usize> {
        self.work
            .scan()
            .find(|l| l.indent.is_some() && l.path == site.path)
            .and_then(|l| l.indent)
    }

    fn rewrite_annotations(&mut self, i: usize, site: &IngressSite, commented: bool) -> usize {
        let line = self.line(i);
        let header_indent = if commented {
            self.child_indent(site)
                .unwrap_or_else(|| uncommented_indent(&line))
        } else {
            match site.spec.get("annotations") {
                None | Some(YamlValue::Null) => {}
                Some(YamlValue::Mapping(map)) if map.is_empty() => {}
                Some(_) => return i + 1,
            }
            leading_spaces(&line)
        };

        let header = if !commented && inline_value(&line).is_empty() {
            terminated(&line)
        } else {
            format!("{}annotations:\n", pad(header_indent))
        };
        let entry_indent = header_indent + self.unit;
        let mut lines = vec![header];

        // Entries sit deeper than the header as written; a commented key at
        // the header's own column is a sibling option.
        let header_column = if commented {
            uncommented_indent(&line)
        } else {
            leading_spaces(&line)
        };
        let mut j = i + 1;
        while let Some(next) = self.work.line(j) {
            if !COMMENTED_KEY_VALUE.is_match(next) || uncommented_indent(next) <= header_column {
                break;
            }
            lines.push(format!("{}{}\n", pad(entry_indent), uncommented_content(next)));
            j += 1;
        }

        if lines.len() == 1 {
            for (key, value) in DEFAULT_ANNOTATIONS {
                lines.push(format!("{}{key}: {value}\n", pad(entry_indent)));
            }
        }

        tracing::debug!(path = %site.path, entries = lines.len() - 1, "ingress annotations activated");
        let next = i + lines.len();
        self.work.splice_lines(i..j, lines);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> KubernetesConfig {
        KubernetesConfig {
            common_storage: "openebs-jiva-rdbox".to_string(),
            common_cert: "rdbox-common-tls".to_string(),
            common_domain: "rdbox.lan".to_string(),
        }
    }

    fn rewrite(module: &str, text: &str) -> RewriteOutcome {
        let config = config();
        IngressRewriter::new(module, &config).filter(&ValuesDocument::from_text(text))
    }

    const STRING_HOSTS: &str = "\
replicaCount: 1
ingress:
  enabled: false
  path: /
  hosts:
    - chart-example.local
  annotations: {}
    # kubernetes.io/ingress.class: nginx
    # kubernetes.io/tls-acme: \"true\"
  labels: {}
  tls:
    # Secrets must be manually created in the namespace.
affinity: {}
";

    #[test]
    fn test_string_hosts() {
        let outcome = rewrite("docker-registry", STRING_HOSTS);
        assert_eq!(
            outcome.text,
            "\
replicaCount: 1
ingress:
  enabled: true
  path: /
  hosts:
#    - chart-example.local
    - docker-registry.rdbox.lan
  annotations:
    kubernetes.io/ingress.class: nginx
    kubernetes.io/tls-acme: \"true\"
  labels: {}
  tls:
    - hosts:
      - '*.rdbox.lan'
      secretName: rdbox-common-tls
    # Secrets must be manually created in the namespace.
affinity: {}
"
        );
        assert!(outcome.changed);
    }

    #[test]
    fn test_string_hosts_idempotent() {
        let first = rewrite("docker-registry", STRING_HOSTS);
        let second = rewrite("docker-registry", &first.text);
        assert!(!second.changed);
        assert_eq!(second.text, first.text);
    }

    #[test]
    fn test_default_annotations_and_empty_hosts() {
        let text = "\
ingress:
  enabled: false
  path: /
  annotations: {}
  hosts: []
  tls: []
";
        let outcome = rewrite("grafana", text);
        assert_eq!(
            outcome.text,
            "\
ingress:
  enabled: true
  path: /
  annotations:
    kubernetes.io/ingress.class: nginx
    kubernetes.io/tls-acme: 'true'
  hosts:
    - grafana.rdbox.lan
  tls:
    - hosts:
      - '*.rdbox.lan'
      secretName: rdbox-common-tls
"
        );
    }

    #[test]
    fn test_commented_sibling_is_not_an_annotation() {
        let text = "\
ingress:
  enabled: false
  path: /
  annotations: {}
  # className: nginx
  hosts: []
  tls: []
";
        let outcome = rewrite("grafana", text);
        assert_eq!(
            outcome.text,
            "\
ingress:
  enabled: true
  path: /
  annotations:
    kubernetes.io/ingress.class: nginx
    kubernetes.io/tls-acme: 'true'
  # className: nginx
  hosts:
    - grafana.rdbox.lan
  tls:
    - hosts:
      - '*.rdbox.lan'
      secretName: rdbox-common-tls
"
        );
    }

    #[test]
    fn test_slash_keyed_block_scalar_annotation() {
        let text = "\
ingress:
  enabled: false
  path: /
  annotations:
    nginx.ingress.kubernetes.io/configuration-snippet: |
      more_set_headers \"X-Frame-Options: DENY\";
  hosts:
    - chart-example.local
  tls: []
";
        let outcome = rewrite("wiki", text);
        assert_eq!(
            outcome.text,
            "\
ingress:
  enabled: true
  path: /
  annotations:
    nginx.ingress.kubernetes.io/configuration-snippet: |
      more_set_headers \"X-Frame-Options: DENY\";
  hosts:
#    - chart-example.local
    - wiki.rdbox.lan
  tls:
    - hosts:
      - '*.rdbox.lan'
      secretName: rdbox-common-tls
"
        );
    }

    #[test]
    fn test_nested_ingress_hostname() {
        let text = "\
server:
  ingress:
    enabled: false
    path: /
    annotations:
      kubernetes.io/ingress.class: traefik
    hosts:
    tls:
      - secretName: existing
        hosts:
          - a.example
";
        let outcome = rewrite("prometheus", text);
        assert_eq!(
            outcome.text,
            "\
server:
  ingress:
    enabled: true
    path: /
    annotations:
      kubernetes.io/ingress.class: traefik
    hosts:
      - server.prometheus.rdbox.lan
    tls:
      - secretName: existing
        hosts:
          - a.example
"
        );
    }

    #[test]
    fn test_object_hosts() {
        let text = "\
ingress:
  enabled: false
  certManager: false
  # annotations:
  #   nginx.ingress.kubernetes.io/proxy-body-size: 0
  hosts:
    - name: chart-example.local
      path: /
      tls: false
      tlsSecret: chart-example-tls
      tlsHosts:
        - chart-example.local
service:
  port: 80
";
        let outcome = rewrite("harbor", text);
        assert_eq!(
            outcome.text,
            "\
ingress:
  enabled: true
  certManager: true
  annotations:
    nginx.ingress.kubernetes.io/proxy-body-size: 0
  hosts:
    - name: harbor.rdbox.lan
      path: /
      tls: true
      tlsSecret: rdbox-common-tls
      tlsHosts:
#        - chart-example.local
        - harbor.rdbox.lan
service:
  port: 80
"
        );

        let again = rewrite("harbor", &outcome.text);
        assert!(!again.changed);
    }

    #[test]
    fn test_object_hosts_missing_companion_is_untouched() {
        let text = "\
ingress:
  enabled: false
  hosts:
    - name: chart-example.local
      path: /
";
        assert!(!rewrite("harbor", text).changed);
    }

    #[test]
    fn test_unrecognized_shapes_untouched() {
        assert!(!rewrite("x", "ingress: false\n").changed);
        assert!(!rewrite("x", "ingress:\n  enabled: false\n").changed);
        assert!(!rewrite("x", "service:\n  port: 80\n").changed);

        let mixed = "\
ingress:
  enabled: false
  path: /
  annotations: {}
  tls: []
  hosts:
    - a.local
    - name: b.local
";
        assert!(!rewrite("x", mixed).changed);
    }

    #[test]
    fn test_detect_shape() {
        let strings: Mapping = serde_yaml::from_str("hosts: ~\n").unwrap();
        let objects: Mapping = serde_yaml::from_str("hosts:\n  - name: a\n").unwrap();
        let empty: Mapping = serde_yaml::from_str("hosts: []\n").unwrap();

        assert_eq!(HostsShape::detect([&strings]), Some(HostsShape::Strings));
        assert_eq!(HostsShape::detect([&empty]), Some(HostsShape::Strings));
        assert_eq!(HostsShape::detect([&objects]), Some(HostsShape::Objects));
        assert_eq!(HostsShape::detect([&strings, &objects]), None);
    }

    #[test]
    fn test_hostname_for() {
        let config = config();
        let rewriter = IngressRewriter::new("nginx", &config);
        assert_eq!(
            rewriter.hostname_for(&StructurePath::from("_.ingress")),
            "nginx.rdbox.lan"
        );
        assert_eq!(
            rewriter.hostname_for(&StructurePath::from("_.controller.web.ingress")),
            "controller.web.nginx.rdbox.lan"
        );
    }
}
