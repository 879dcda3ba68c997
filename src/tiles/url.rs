//! Tile URL templates
//!
//! Placeholders: `{z}`, `{x}`, `{y}`, `{s}` (subdomain), `{r}` (`@2x` on
//! double-size layers) and `{-y}` (row counted from the bottom).

use anyhow::{Result, bail};

use super::options::TileLayerOptions;
use crate::domain::TileCoord;

/// Expand `template` for a source tile and the zoom used in URLs
pub fn expand(
    template: &str,
    coords: TileCoord,
    url_zoom: i32,
    options: &TileLayerOptions,
) -> Result<String> {
    let inverted_y = inverted_row(coords.y, url_zoom);
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let key = rest[start + 1..start + len].trim();
        match key {
            "z" => out.push_str(&url_zoom.to_string()),
            "x" => out.push_str(&coords.x.to_string()),
            "y" if options.tms => out.push_str(&inverted_y.to_string()),
            "y" => out.push_str(&coords.y.to_string()),
            "-y" => out.push_str(&inverted_y.to_string()),
            "s" => out.push_str(subdomain(coords, &options.subdomains)),
            "r" if options.double_size => out.push_str("@2x"),
            "r" => {}
            other => bail!("No value provided for tile URL variable {{{}}}", other),
        }
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn subdomain(coords: TileCoord, subdomains: &[String]) -> &str {
    if subdomains.is_empty() {
        return "";
    }
    let index = (coords.x as i64 + coords.y as i64).unsigned_abs() as usize % subdomains.len();
    &subdomains[index]
}

fn inverted_row(y: i32, zoom: i32) -> i64 {
    if (0..31).contains(&zoom) {
        (1i64 << zoom) - 1 - y as i64
    } else {
        y as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_template() {
        let options = TileLayerOptions::default();
        let url = expand("/map/{z}/{y}/{x}.webp", TileCoord::new(14, 15, 3), 3, &options).unwrap();
        assert_eq!(url, "/map/3/15/14.webp");
    }

    #[test]
    fn test_subdomain_and_retina() {
        let options = TileLayerOptions {
            double_size: true,
            ..Default::default()
        };
        let url = expand(
            "https://{s}.tiles.example/{z}/{x}/{y}{r}.png",
            TileCoord::new(1, 3, 2),
            2,
            &options,
        )
        .unwrap();
        assert_eq!(url, "https://b.tiles.example/2/1/3@2x.png");
    }

    #[test]
    fn test_inverted_row() {
        let options = TileLayerOptions::default();
        let url = expand("{z}/{x}/{-y}", TileCoord::new(0, 1, 2), 2, &options).unwrap();
        assert_eq!(url, "2/0/2");

        let tms = TileLayerOptions {
            tms: true,
            ..Default::default()
        };
        let url = expand("{z}/{x}/{y}", TileCoord::new(0, 1, 2), 2, &tms).unwrap();
        assert_eq!(url, "2/0/2");
    }

    #[test]
    fn test_unknown_placeholder_is_an_error() {
        let options = TileLayerOptions::default();
        assert!(expand("{z}/{foo}", TileCoord::default(), 0, &options).is_err());
    }

    #[test]
    fn test_unclosed_brace_is_literal() {
        let options = TileLayerOptions::default();
        let url = expand("{z}/tile{", TileCoord::default(), 4, &options).unwrap();
        assert_eq!(url, "4/tile{");
    }
}
