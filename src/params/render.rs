//! HTML rendering of the parameter store.
//!
//! Values are written into the markup verbatim. No entity escaping is done,
//! so submitted markup is rendered as markup.

/// Render every stored `(name, values)` pair as a table, one row per value.
pub fn render_params_page(entries: &[(String, Vec<String>)]) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n    \
         <meta charset=\"UTF-8\">\n    \
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n    \
         <title>Submitted Parameters</title>\n\
         </head>\n\
         <body>\n    \
         <h1>Submitted Parameters</h1>\n    \
         <table border=\"1\">\n        \
         <tr>\n            \
         <th>Parameter Name</th>\n            \
         <th>Value</th>\n        \
         </tr>\n",
    );

    for (name, values) in entries {
        for value in values {
            html.push_str(&format!(
                "        <tr>\n            <td>{name}</td>\n            <td>{value}</td>\n        </tr>\n"
            ));
        }
    }

    html.push_str("    </table>\n</body>\n</html>");
    html
}
