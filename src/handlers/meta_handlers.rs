use actix_web::{http::header::ContentType, web, HttpResponse};
use log::{info, warn};

use crate::config::SiteConfig;
use crate::handlers::parse_object_id;
use crate::models::{ApiError, Product};
use crate::services::MongoDBService;
use crate::utils::html::{escape_html, truncate};

const DESCRIPTION_LEN: usize = 160;

/// Content for one share card.
pub struct SharePage {
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub url: String,
    pub og_type: &'static str,
}

impl SharePage {
    fn home(site: &SiteConfig) -> Self {
        Self {
            title: site.name.clone(),
            description: format!("Shop fashion and goods from China and Nigeria, delivered to Cameroon by {}", site.name),
            image: None,
            url: format!("{}/", site.frontend_url),
            og_type: "website",
        }
    }

    fn product(site: &SiteConfig, product: &Product, id: &str) -> Self {
        let description = if product.description.trim().is_empty() {
            format!("{} - {} XAF", product.name, product.price)
        } else {
            product.description.trim().to_string()
        };
        let image = product.images.first()
            .or_else(|| product.colors.iter().flat_map(|c| c.images.first()).next())
            .cloned();
        Self {
            title: format!("{} | {}", product.name, site.name),
            description: truncate(&description, DESCRIPTION_LEN),
            image,
            url: format!("{}/product/{}", site.frontend_url, id),
            og_type: "product",
        }
    }
}

/// Renders a page for link-preview crawlers that sends browsers on to the storefront.
pub fn render_share_page(site: &SiteConfig, page: &SharePage) -> String {
    let title = escape_html(&page.title);
    let description = escape_html(&page.description);
    let url = escape_html(&page.url);
    let site_name = escape_html(&site.name);

    let image_tags = match &page.image {
        Some(image) => {
            let image = escape_html(image);
            format!(
                "    <meta property=\"og:image\" content=\"{image}\" />\n    <meta name=\"twitter:image\" content=\"{image}\" />\n"
            )
        }
        None => String::new(),
    };
    let card = if page.image.is_some() { "summary_large_image" } else { "summary" };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8" />
    <title>{title}</title>
    <meta name="description" content="{description}" />
    <meta property="og:site_name" content="{site_name}" />
    <meta property="og:type" content="{og_type}" />
    <meta property="og:title" content="{title}" />
    <meta property="og:description" content="{description}" />
    <meta property="og:url" content="{url}" />
{image_tags}    <meta name="twitter:card" content="{card}" />
    <meta name="twitter:title" content="{title}" />
    <meta name="twitter:description" content="{description}" />
    <link rel="canonical" href="{url}" />
    <meta http-equiv="refresh" content="0; url={url}" />
</head>
<body>
    <p>Redirecting to <a href="{url}">{title}</a>...</p>
    <script>window.location.replace("{url}");</script>
</body>
</html>
"#,
        og_type = page.og_type,
    )
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok().content_type(ContentType::html()).body(body)
}

pub async fn home_meta(site: web::Data<SiteConfig>) -> HttpResponse {
    info!("Serving homepage share page");
    html(render_share_page(&site, &SharePage::home(&site)))
}

pub async fn product_meta(
    mongodb: web::Data<MongoDBService>,
    site: web::Data<SiteConfig>,
    product_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    info!("Serving share page for product {}", product_id);
    let id = parse_object_id(&product_id, "product")?;

    let page = match mongodb.get_product(&id).await? {
        Some(product) if product.is_active => SharePage::product(&site, &product, &id.to_hex()),
        _ => {
            warn!("Share page requested for missing product {}, falling back to homepage", id);
            SharePage::home(&site)
        }
    };
    Ok(html(render_share_page(&site, &page)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::product::tests::sample_product;

    fn site() -> SiteConfig {
        SiteConfig {
            name: "Shop & Co".to_string(),
            frontend_url: "https://shop.example".to_string(),
        }
    }

    #[test]
    fn test_product_share_page_tags() {
        let mut product = sample_product();
        product.name = "Dress <\"Ankara\">".to_string();
        let id = product.id.unwrap().to_hex();

        let body = render_share_page(&site(), &SharePage::product(&site(), &product, &id));
        assert!(body.contains("<meta property=\"og:title\" content=\"Dress &lt;&quot;Ankara&quot;&gt; | Shop &amp; Co\" />"));
        assert!(body.contains("<meta property=\"og:type\" content=\"product\" />"));
        assert!(body.contains("<meta property=\"og:image\" content=\"https://img.example/dress.jpg\" />"));
        assert!(body.contains("twitter:card\" content=\"summary_large_image\""));
        assert!(body.contains(&format!("url=https://shop.example/product/{}", id)));
        assert!(!body.contains("<\"Ankara\">"));
    }

    #[test]
    fn test_home_share_page_without_image() {
        let body = render_share_page(&site(), &SharePage::home(&site()));
        assert!(body.contains("<title>Shop &amp; Co</title>"));
        assert!(body.contains("twitter:card\" content=\"summary\""));
        assert!(!body.contains("og:image"));
        assert!(body.contains("window.location.replace(\"https://shop.example/\")"));
    }

    #[test]
    fn test_long_description_is_truncated() {
        let mut product = sample_product();
        product.description = "x".repeat(500);
        let page = SharePage::product(&site(), &product, "abc");
        assert_eq!(page.description.chars().count(), DESCRIPTION_LEN);
    }
}
