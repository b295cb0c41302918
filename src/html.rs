//! Small HTML building helpers shared by the engines.

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders a plain `<table>` with a header row. Cells are escaped.
pub fn table<S: AsRef<str>>(header: &[S], rows: &[Vec<String>]) -> String {
    let mut html = String::from("<table border=\"1\" class=\"dataframe\">\n<thead>\n<tr>");
    for h in header {
        html.push_str(&format!("<th>{}</th>", escape_html(h.as_ref())));
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&format!("<td>{}</td>", escape_html(cell)));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>");
    html
}

pub fn pre(text: &str) -> String {
    format!("<pre>{}</pre>", escape_html(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>&\"'"), "&lt;b&gt;&amp;&quot;&#39;");
        assert_eq!(escape_html("ACDE"), "ACDE");
    }

    #[test]
    fn test_table() {
        let html = table(
            &["ID", "Sequence"],
            &[vec!["s1".to_string(), "AC<".to_string()]],
        );
        assert!(html.contains("<th>ID</th><th>Sequence</th>"));
        assert!(html.contains("<td>s1</td><td>AC&lt;</td>"));
    }
}
