//! Heuristic markup extraction.
//!
//! Storefront markup varies between themes and breaks without notice, so
//! every field is resolved by an ordered list of selector strategies; the
//! first one producing a non-empty value wins. Inability to extract a field
//! yields an absent value, never an error, and a page that fails outright
//! simply produces an empty list.

pub mod linked_data;
pub mod strategies;

use std::collections::HashSet;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ProductDetail, RawCategory, RawProductSummary, SceneImage};
use crate::utils::{resolve_url, slug_from_url};

use linked_data::product_linked_data;
use strategies::{first_image, parse_price};

/// Selector-driven extractor with all strategies precompiled.
///
/// Construction is the only fallible step; extraction itself never fails.
pub struct Extractor {
    anchor: Selector,
    og_image: Selector,
    og_description: Selector,

    category_items: Vec<Selector>,
    category_name: Vec<Selector>,

    product_items: Vec<Selector>,
    product_name: Vec<Selector>,
    product_price: Vec<Selector>,
    product_code: Vec<Selector>,
    product_dimensions: Vec<Selector>,

    detail_name: Vec<Selector>,
    detail_code: Vec<Selector>,
    detail_description: Vec<Selector>,
    detail_material: Vec<Selector>,
    detail_regular_price: Vec<Selector>,
    detail_sale_price: Vec<Selector>,
    spec_tables: Vec<Selector>,
    spec_lists: Vec<Selector>,
    color_options: Vec<Selector>,
    scene_items: Vec<Selector>,
    gallery_scopes: Vec<Selector>,
    special_notes: Vec<Selector>,

    code_re: Regex,
}

impl Extractor {
    /// Compile every strategy list.
    pub fn new() -> Result<Self> {
        Ok(Self {
            anchor: compile_one("a[href]")?,
            og_image: compile_one(r#"meta[property="og:image"]"#)?,
            og_description: compile_one(r#"meta[property="og:description"]"#)?,

            category_items: compile(&[
                "ul.category-list > li",
                ".xans-layout-category li",
                "nav .cate-depth1 > li",
                ".category-grid .category-card",
            ])?,
            category_name: compile(&[".name", "span.title", "a"])?,

            product_items: compile(&[
                "ul.prdList > li",
                "li.xans-record-",
                ".product-list .product-item",
                "ul.goods-list > li",
            ])?,
            product_name: compile(&[".name a", ".name", "p.prd-name", "strong.title"])?,
            product_price: compile(&[
                r#"li[rel="판매가"] span"#,
                ".xans-product-baseprice",
                ".price",
                "span.sale-price",
            ])?,
            product_code: compile(&[".product-code", "li.code span", ".model"])?,
            product_dimensions: compile(&[r#"li[rel="크기"] span"#, ".size", ".spec-size"])?,

            detail_name: compile(&[
                ".headingArea h2",
                ".infoArea h2",
                "h1.product-title",
                ".detail-header .name",
            ])?,
            detail_code: compile(&[
                "#product_code",
                ".product-code span",
                "li.prd-code span",
                ".infoArea .code",
            ])?,
            detail_description: compile(&[
                "#prdDetail .detail-text",
                ".product-description",
                "#prdDetail .cont",
                ".detail-content p",
            ])?,
            detail_material: compile(&[".material", "li.material span"])?,
            detail_regular_price: compile(&[
                ".regular-price",
                "del.price",
                ".price-origin",
                "#span_product_price_custom",
            ])?,
            detail_sale_price: compile(&[
                ".sale-price",
                ".price-sale em",
                "#span_product_price_text",
                ".infoArea .price strong",
            ])?,
            spec_tables: compile(&[
                "table.xans-product-detaildesign",
                "#prdInfo table",
                "table.product-spec",
                ".detail-spec table",
            ])?,
            spec_lists: compile(&["dl.spec", ".product-info dl", "dl.item-spec"])?,
            color_options: compile(&[
                r#"select[name*="option"] option"#,
                ".xans-product-option li",
                "ul.color-chip li",
                ".option-color li",
            ])?,
            scene_items: compile(&[
                ".scene-list li",
                ".styling-list .styling-item",
                "ul.prd-scene li",
            ])?,
            gallery_scopes: compile(&[
                ".xans-product-image img",
                ".product-gallery img",
                "ul.thumbnail li img",
                ".keyImg img",
                "#prdDetail img",
            ])?,
            special_notes: compile(&[
                ".info-notice li",
                ".xans-product-additional li",
                ".delivery-notice p",
            ])?,

            code_re: Regex::new(
                r"(?i)(?:상품코드|품번|product\s*code|model\s*no\.?)\s*[:：]?\s*([A-Za-z0-9][A-Za-z0-9_-]{2,})",
            )
            .expect("static pattern"),
        })
    }

    /// Extract the category list from a catalog page.
    ///
    /// Slugs are unique within the result; the first occurrence wins.
    pub fn extract_categories(&self, document: &Html, page_url: &str) -> Vec<RawCategory> {
        let Ok(base) = Url::parse(page_url) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut categories = Vec::new();

        for item in select_items(document, &self.category_items) {
            let Some(anchor) = item.select(&self.anchor).next() else {
                continue;
            };
            let Some(href) = usable_href(&anchor) else {
                continue;
            };

            let name = first_text(&item, &self.category_name)
                .unwrap_or_else(|| clean_text(&anchor.text().collect::<String>()));
            if name.is_empty() {
                continue;
            }

            let url = resolve_url(&base, &href);
            let Some(slug) = slug_from_url(&url, &name) else {
                continue;
            };
            if !seen.insert(slug.clone()) {
                continue;
            }

            let image_url = first_image(&item).map(|raw| resolve_url(&base, &raw));
            categories.push(RawCategory {
                name_source: name,
                slug,
                url,
                image_url,
            });
        }

        categories
    }

    /// Extract product summaries from a category list page.
    pub fn extract_product_summaries(
        &self,
        document: &Html,
        page_url: &str,
        category_slug: &str,
    ) -> Vec<RawProductSummary> {
        let Ok(base) = Url::parse(page_url) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut summaries = Vec::new();

        for item in select_items(document, &self.product_items) {
            let Some(anchor) = self.product_anchor(&item) else {
                continue;
            };
            let Some(href) = usable_href(&anchor) else {
                continue;
            };

            let name = first_text(&item, &self.product_name)
                .unwrap_or_else(|| clean_text(&anchor.text().collect::<String>()));
            if name.is_empty() {
                continue;
            }

            let detail_url = resolve_url(&base, &href);
            if !seen.insert(detail_url.clone()) {
                continue;
            }

            let product_code = first_text(&item, &self.product_code)
                .or_else(|| attr_on(&item, "data-product-code"))
                .or_else(|| attr_on(&anchor, "data-product-code"));

            summaries.push(RawProductSummary {
                name_source: name,
                product_code,
                detail_url,
                image_url: first_image(&item).map(|raw| resolve_url(&base, &raw)),
                price: first_text(&item, &self.product_price)
                    .as_deref()
                    .and_then(parse_price),
                dimensions: first_text(&item, &self.product_dimensions),
                category_slug: category_slug.to_string(),
            });
        }

        summaries
    }

    /// Extract supplementary fields from a product detail page.
    ///
    /// Returns `None` when the page yielded nothing recognizable at all. The
    /// image gallery is raw page-order URLs; canonicalization is the image
    /// resolver's job.
    pub fn extract_product_detail(&self, document: &Html, url: &str) -> Option<ProductDetail> {
        let linked = product_linked_data(document);

        let specs = self.extract_specs(document);
        let material = first_text_doc(document, &self.detail_material).or_else(|| {
            const MATERIAL_LABELS: &[&str] = &["소재", "재질", "material", "Material"];
            MATERIAL_LABELS
                .iter()
                .find_map(|label| specs.get(*label).cloned())
        });

        let description_source = first_text_doc(document, &self.detail_description)
            .or_else(|| linked.as_ref().and_then(|l| l.description.clone()))
            .or_else(|| self.meta_content(document, &self.og_description));

        let product_code = first_text_doc(document, &self.detail_code).or_else(|| {
            let text: String = document.root_element().text().collect();
            self.code_re
                .captures(&text)
                .map(|caps| caps[1].to_string())
        });

        let mut image_gallery = self.extract_gallery(document);
        if let Some(linked) = &linked {
            image_gallery.extend(linked.images.iter().cloned());
        }
        if image_gallery.is_empty() {
            // Platform fallback so a detail page always has a shot at a
            // primary image.
            image_gallery.extend(self.meta_content(document, &self.og_image));
        }

        let detail = ProductDetail {
            name_source: first_text_doc(document, &self.detail_name),
            product_code,
            description_source,
            material,
            specs,
            color_options: self.extract_colors(document),
            scene_images: self.extract_scenes(document, url),
            image_gallery,
            regular_price: first_text_doc(document, &self.detail_regular_price)
                .as_deref()
                .and_then(parse_price),
            sale_price: first_text_doc(document, &self.detail_sale_price)
                .as_deref()
                .and_then(parse_price),
            special_notes: self.extract_notes(document),
        };

        if detail.is_empty() { None } else { Some(detail) }
    }

    /// Prefer an anchor pointing into the product namespace.
    fn product_anchor<'a>(&self, item: &ElementRef<'a>) -> Option<ElementRef<'a>> {
        let mut first = None;
        for anchor in item.select(&self.anchor) {
            if first.is_none() {
                first = Some(anchor);
            }
            if anchor
                .value()
                .attr("href")
                .is_some_and(|href| href.contains("/product"))
            {
                return Some(anchor);
            }
        }
        first
    }

    /// Spec rows from the first populated table, else the first populated
    /// definition list.
    fn extract_specs(&self, document: &Html) -> std::collections::BTreeMap<String, String> {
        let mut specs = std::collections::BTreeMap::new();

        let row_sel = Selector::parse("tr").expect("static selector");
        let cell_sel = Selector::parse("th, td").expect("static selector");
        for table in select_items(document, &self.spec_tables) {
            for row in table.select(&row_sel) {
                let cells: Vec<_> = row.select(&cell_sel).collect();
                if cells.len() < 2 {
                    continue;
                }
                let key = clean_text(&cells[0].text().collect::<String>());
                let value = clean_text(&cells[1].text().collect::<String>());
                if !key.is_empty() && usable_value(&value) {
                    specs.entry(key).or_insert(value);
                }
            }
            if !specs.is_empty() {
                return specs;
            }
        }

        let dt_sel = Selector::parse("dt").expect("static selector");
        let dd_sel = Selector::parse("dd").expect("static selector");
        for list in select_items(document, &self.spec_lists) {
            let terms: Vec<_> = list.select(&dt_sel).collect();
            let definitions: Vec<_> = list.select(&dd_sel).collect();
            for (term, definition) in terms.iter().zip(definitions.iter()) {
                let key = clean_text(&term.text().collect::<String>());
                let value = clean_text(&definition.text().collect::<String>());
                if !key.is_empty() && usable_value(&value) {
                    specs.entry(key).or_insert(value);
                }
            }
            if !specs.is_empty() {
                return specs;
            }
        }

        specs
    }

    /// Color option names, with select-box placeholders filtered out.
    fn extract_colors(&self, document: &Html) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut colors = Vec::new();

        for item in select_items(document, &self.color_options) {
            let text = clean_text(
                &item
                    .value()
                    .attr("title")
                    .map(str::to_string)
                    .unwrap_or_else(|| item.text().collect::<String>()),
            );
            if text.is_empty() || is_option_placeholder(&text) {
                continue;
            }
            if item.value().attr("value").is_some_and(|v| {
                let v = v.trim();
                v.is_empty() || v == "*" || v == "**"
            }) {
                continue;
            }
            if seen.insert(text.clone()) {
                colors.push(text);
            }
        }

        colors
    }

    /// Scene photos: an image plus the scene page it links to.
    fn extract_scenes(&self, document: &Html, page_url: &str) -> Vec<SceneImage> {
        let Ok(base) = Url::parse(page_url) else {
            return Vec::new();
        };

        let mut scenes = Vec::new();
        for item in select_items(document, &self.scene_items) {
            let Some(anchor) = item.select(&self.anchor).next() else {
                continue;
            };
            let Some(href) = usable_href(&anchor) else {
                continue;
            };
            let Some(image) = first_image(&item) else {
                continue;
            };

            let name = item
                .select(&Selector::parse("img[alt]").expect("static selector"))
                .next()
                .and_then(|img| img.value().attr("alt"))
                .map(clean_text)
                .filter(|alt| !alt.is_empty())
                .unwrap_or_else(|| clean_text(&anchor.text().collect::<String>()));

            scenes.push(SceneImage {
                name,
                image_url: resolve_url(&base, &image),
                scene_url: resolve_url(&base, &href),
            });
        }

        scenes
    }

    /// Union of every gallery scope, in page order. Duplicates are the
    /// resolver's problem.
    fn extract_gallery(&self, document: &Html) -> Vec<String> {
        let mut urls = Vec::new();
        for selector in &self.gallery_scopes {
            for element in document.select(selector) {
                if let Some(url) = first_image(&element) {
                    urls.push(url);
                }
            }
        }
        urls
    }

    fn extract_notes(&self, document: &Html) -> Vec<String> {
        for selector in &self.special_notes {
            let notes: Vec<String> = document
                .select(selector)
                .map(|el| clean_text(&el.text().collect::<String>()))
                .filter(|text| !text.is_empty())
                .collect();
            if !notes.is_empty() {
                return notes;
            }
        }
        Vec::new()
    }

    fn meta_content(&self, document: &Html, selector: &Selector) -> Option<String> {
        document
            .select(selector)
            .next()
            .and_then(|meta| meta.value().attr("content"))
            .map(clean_text)
            .filter(|content| !content.is_empty())
    }
}

/// Compile a single selector.
fn compile_one(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| AppError::selector(selector, format!("{e:?}")))
}

/// Compile a strategy list, in order.
fn compile(selectors: &[&str]) -> Result<Vec<Selector>> {
    selectors.iter().map(|s| compile_one(s)).collect()
}

/// First selector producing any match wins; its full match set is the
/// result.
fn select_items<'a>(document: &'a Html, selectors: &[Selector]) -> Vec<ElementRef<'a>> {
    for selector in selectors {
        let items: Vec<_> = document.select(selector).collect();
        if !items.is_empty() {
            return items;
        }
    }
    Vec::new()
}

/// First selector under `scope` with non-empty text wins.
fn first_text(scope: &ElementRef, selectors: &[Selector]) -> Option<String> {
    for selector in selectors {
        if let Some(element) = scope.select(selector).next() {
            let text = clean_text(&element.text().collect::<String>());
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// Document-rooted variant of [`first_text`].
fn first_text_doc(document: &Html, selectors: &[Selector]) -> Option<String> {
    for selector in selectors {
        if let Some(element) = document.select(selector).next() {
            let text = clean_text(&element.text().collect::<String>());
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// Collapse runs of whitespace.
fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn usable_value(value: &str) -> bool {
    !value.is_empty() && value != "-" && value != "N/A" && value != "TBD"
}

fn usable_href(anchor: &ElementRef) -> Option<String> {
    let href = anchor.value().attr("href")?.trim();
    if href.is_empty() || href == "#" || href.starts_with("javascript:") {
        return None;
    }
    Some(href.to_string())
}

fn attr_on(element: &ElementRef, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn is_option_placeholder(text: &str) -> bool {
    text.starts_with('-')
        || text.starts_with('*')
        || text.starts_with('[')
        || text.contains("선택")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> Extractor {
        Extractor::new().unwrap()
    }

    const CATALOG_PAGE: &str = r##"<html><body>
        <ul class="category-list">
            <li><a href="/category/chairs/24/"><span class="title">의자</span></a>
                <img src="/img/cate_chairs.jpg"></li>
            <li><a href="/category/tables/25/"><span class="title">테이블</span></a></li>
            <li><a href="#"><span class="title">바로가기</span></a></li>
            <li><a href="/category/chairs/24/"><span class="title">의자 중복</span></a></li>
        </ul>
    </body></html>"##;

    #[test]
    fn test_extract_categories() {
        let document = Html::parse_document(CATALOG_PAGE);
        let categories =
            extractor().extract_categories(&document, "https://shop.example.com/main");

        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].slug, "chairs");
        assert_eq!(categories[0].name_source, "의자");
        assert_eq!(categories[0].url, "https://shop.example.com/category/chairs/24/");
        assert_eq!(
            categories[0].image_url.as_deref(),
            Some("https://shop.example.com/img/cate_chairs.jpg")
        );
        assert_eq!(categories[1].slug, "tables");
        assert!(categories[1].image_url.is_none());
    }

    #[test]
    fn test_extract_categories_bad_page() {
        let document = Html::parse_document("<html><body><p>maintenance</p></body></html>");
        let categories =
            extractor().extract_categories(&document, "https://shop.example.com/main");
        assert!(categories.is_empty());
    }

    const LIST_PAGE: &str = r#"<html><body>
        <ul class="prdList">
            <li>
                <a href="/product/oak-armchair/1021/"><img src="/img/1021_300x300.jpg"></a>
                <p class="prd-name">오크 암체어</p>
                <ul><li rel="판매가"><span>128,000원</span></li>
                    <li rel="크기"><span>W600 x D550 x H790</span></li></ul>
            </li>
            <li>
                <a href="/product/walnut-desk/1022/"></a>
                <p class="prd-name">월넛 데스크</p>
                <span class="price">342,000원</span>
            </li>
            <li><span>품절 안내</span></li>
        </ul>
    </body></html>"#;

    #[test]
    fn test_extract_product_summaries() {
        let document = Html::parse_document(LIST_PAGE);
        let summaries = extractor().extract_product_summaries(
            &document,
            "https://shop.example.com/category/chairs/24/",
            "chairs",
        );

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].name_source, "오크 암체어");
        assert_eq!(
            summaries[0].detail_url,
            "https://shop.example.com/product/oak-armchair/1021/"
        );
        assert_eq!(summaries[0].price, Some(128_000));
        assert_eq!(
            summaries[0].dimensions.as_deref(),
            Some("W600 x D550 x H790")
        );
        assert_eq!(
            summaries[0].image_url.as_deref(),
            Some("https://shop.example.com/img/1021_300x300.jpg")
        );
        assert_eq!(summaries[0].category_slug, "chairs");

        assert_eq!(summaries[1].name_source, "월넛 데스크");
        assert!(summaries[1].image_url.is_none());
        assert_eq!(summaries[1].price, Some(342_000));
    }

    const DETAIL_PAGE: &str = r#"<html><head>
        <meta property="og:image" content="/img/og_1021.jpg">
        <meta property="og:description" content="og description">
        <script type="application/ld+json">
            {"@type":"Product","description":"Solid oak frame armchair.",
             "image":["https://cdn.example.com/1021_b.jpg"]}
        </script>
    </head><body>
        <div class="headingArea"><h2>오크 암체어</h2></div>
        <div class="infoArea">
            <span class="code">CH-1021</span>
            <p class="price"><del class="price">160,000원</del><strong>128,000원</strong></p>
        </div>
        <div class="xans-product-image">
            <img src="/img/1021_500x500.jpg">
            <img ec-data-src="/img/1021_detail.jpg">
        </div>
        <table class="product-spec">
            <tr><th>소재</th><td>오크 원목</td></tr>
            <tr><th>원산지</th><td>대한민국</td></tr>
            <tr><th>비고</th><td>-</td></tr>
        </table>
        <select name="product_option1">
            <option value="*">- [필수] 옵션을 선택해 주세요 -</option>
            <option value="natural">내추럴</option>
            <option value="walnut">월넛</option>
        </select>
        <ul class="scene-list">
            <li><a href="/scene/living-01/"><img src="/img/scene1.jpg" alt="거실 연출"></a></li>
        </ul>
        <ul class="info-notice"><li>배송 2주 소요</li></ul>
    </body></html>"#;

    #[test]
    fn test_extract_product_detail() {
        let document = Html::parse_document(DETAIL_PAGE);
        let detail = extractor()
            .extract_product_detail(&document, "https://shop.example.com/product/oak-armchair/1021/")
            .unwrap();

        assert_eq!(detail.name_source.as_deref(), Some("오크 암체어"));
        assert_eq!(detail.product_code.as_deref(), Some("CH-1021"));
        // Linked data beats og:description; no explicit description block.
        assert_eq!(
            detail.description_source.as_deref(),
            Some("Solid oak frame armchair.")
        );
        assert_eq!(detail.material.as_deref(), Some("오크 원목"));
        assert_eq!(detail.specs.get("원산지").map(String::as_str), Some("대한민국"));
        assert!(!detail.specs.contains_key("비고"));
        assert_eq!(detail.color_options, vec!["내추럴", "월넛"]);
        assert_eq!(detail.regular_price, Some(160_000));
        assert_eq!(detail.sale_price, Some(128_000));
        assert_eq!(detail.scene_images.len(), 1);
        assert_eq!(detail.scene_images[0].name, "거실 연출");
        assert_eq!(
            detail.scene_images[0].scene_url,
            "https://shop.example.com/scene/living-01/"
        );
        assert_eq!(detail.special_notes, vec!["배송 2주 소요"]);

        // Gallery is raw page-order URLs: the two gallery slots (src and
        // lazy marker) plus the linked-data image.
        assert_eq!(
            detail.image_gallery,
            vec![
                "/img/1021_500x500.jpg",
                "/img/1021_detail.jpg",
                "https://cdn.example.com/1021_b.jpg",
            ]
        );
    }

    #[test]
    fn test_detail_og_image_fallback_when_gallery_empty() {
        let html = r#"<html><head>
            <meta property="og:image" content="/img/only.jpg">
        </head><body><div class="headingArea"><h2>상품</h2></div></body></html>"#;
        let document = Html::parse_document(html);
        let detail = extractor()
            .extract_product_detail(&document, "https://shop.example.com/product/1")
            .unwrap();
        assert_eq!(detail.image_gallery, vec!["/img/only.jpg"]);
    }

    #[test]
    fn test_detail_empty_page_is_none() {
        let document = Html::parse_document("<html><body><p>404</p></body></html>");
        assert!(
            extractor()
                .extract_product_detail(&document, "https://shop.example.com/product/1")
                .is_none()
        );
    }

    #[test]
    fn test_detail_code_regex_fallback() {
        let html = r#"<html><body>
            <div class="headingArea"><h2>수납장</h2></div>
            <p>상품코드: ST-5512 / 무료배송</p>
        </body></html>"#;
        let document = Html::parse_document(html);
        let detail = extractor()
            .extract_product_detail(&document, "https://shop.example.com/product/2")
            .unwrap();
        assert_eq!(detail.product_code.as_deref(), Some("ST-5512"));
    }
}
