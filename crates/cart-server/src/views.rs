//! HTML Views
//!
//! Server-rendered pages and embeddable fragments, rendered from the
//! minijinja templates under `templates/`. Template names end in `.html`,
//! so every interpolated value is HTML-escaped.

use minijinja::{context, Environment, Error, Value};
use rust_decimal::Decimal;

use cart_commerce::{HostCartLine, Order, OrderLine, OrderStatus};
use cart_core::{CartItem, Notice, NoticeKind};

const TEMPLATES: [(&str, &str); 6] = [
    ("layout.html", include_str!("../templates/layout.html")),
    ("cart.html", include_str!("../templates/cart.html")),
    ("cart_link.html", include_str!("../templates/cart_link.html")),
    ("add_button.html", include_str!("../templates/add_button.html")),
    ("host_checkout.html", include_str!("../templates/host_checkout.html")),
    ("order_pay.html", include_str!("../templates/order_pay.html")),
];

/// Price with two decimals
pub fn money(symbol: &str, amount: Decimal) -> String {
    format!("{symbol}{amount:.2}")
}

/// One rendered cart row
#[derive(Clone, Debug)]
pub struct CartRow {
    /// Position in the cart (0-based)
    pub index: usize,

    pub item: CartItem,

    /// Service title, `Service #id` when the service is gone
    pub title: String,

    pub thumbnail_url: Option<String>,

    pub permalink: Option<String>,
}

/// Everything the cart page shows
pub struct CartPage<'a> {
    pub rows: &'a [CartRow],
    pub total: Decimal,
    pub notice: Option<Notice>,
    pub remove_token: &'a str,
    pub proceed_token: &'a str,
    pub currency_symbol: &'a str,
}

/// Header cart link
pub struct CartLink<'a> {
    pub url: &'a str,
    pub count: usize,
    pub class: &'a str,
    pub show_icon: bool,
    pub show_count: bool,
}

/// Add-to-cart button for one service
pub struct AddButton<'a> {
    pub service_id: u64,
    pub package_key: Option<&'a str>,
    pub addon_ids: &'a [u64],
    pub token: &'a str,
    pub text: &'a str,
    pub class: &'a str,
    pub cart_url: &'a str,
}

/// Host checkout page for the in-process host cart
pub struct HostCheckoutPage<'a> {
    pub lines: &'a [HostCartLine],
    pub token: &'a str,
    pub checkout_url: &'a str,
    pub cart_url: &'a str,
    pub currency_symbol: &'a str,
}

/// Compiled templates
pub struct Views {
    env: Environment<'static>,
}

impl Views {
    pub fn new() -> Result<Self, Error> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        for (name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }

    fn render(&self, name: &str, ctx: Value) -> Result<String, Error> {
        self.env.get_template(name)?.render(ctx)
    }

    /// Full cart page
    pub fn cart_page(&self, page: &CartPage<'_>) -> Result<String, Error> {
        let rows: Vec<Value> = page
            .rows
            .iter()
            .map(|row| {
                context! {
                    index => row.index,
                    key => row.item.key.map(|k| k.to_string()),
                    title => row.title,
                    thumbnail_url => row.thumbnail_url,
                    permalink => row.permalink,
                    price => money(page.currency_symbol, row.item.price),
                }
            })
            .collect();

        let notice = page.notice.map(|notice| {
            context! {
                class => match notice.kind {
                    NoticeKind::Success => "notice-success",
                    NoticeKind::Error => "notice-error",
                },
                code => notice.code.as_str(),
                message => notice.message(),
            }
        });

        self.render(
            "cart.html",
            context! {
                title => "Service Cart",
                notice,
                rows,
                total => money(page.currency_symbol, page.total),
                remove_token => page.remove_token,
                proceed_token => page.proceed_token,
            },
        )
    }

    /// Header cart link with icon and item count
    pub fn cart_link(&self, link: &CartLink<'_>) -> Result<String, Error> {
        let aria_label = if link.count > 0 {
            format!("Cart ({})", link.count)
        } else {
            "Cart".to_string()
        };

        self.render(
            "cart_link.html",
            context! {
                url => link.url,
                class => link.class,
                aria_label,
                count => link.count,
                show_icon => link.show_icon,
                show_count => link.show_count,
            },
        )
    }

    /// Add-to-cart form; works without script, upgraded by `add-to-cart.js`
    pub fn add_to_cart_button(&self, button: &AddButton<'_>) -> Result<String, Error> {
        self.render(
            "add_button.html",
            context! {
                service_id => button.service_id,
                package_key => button.package_key,
                addon_ids => button.addon_ids,
                token => button.token,
                text => button.text,
                class => button.class,
                cart_url => button.cart_url,
            },
        )
    }

    /// Host checkout: the lines the hand-off transferred, and a place-order form
    pub fn host_checkout(&self, page: &HostCheckoutPage<'_>) -> Result<String, Error> {
        let lines: Vec<Value> = page
            .lines
            .iter()
            .map(|line| {
                context! {
                    name => line.name(),
                    thumbnail_url => line.display.thumbnail_url,
                    permalink => line.display.permalink,
                    price => money(page.currency_symbol, line.price()),
                }
            })
            .collect();
        let total: Decimal = page.lines.iter().map(HostCartLine::price).sum();

        self.render(
            "host_checkout.html",
            context! {
                title => "Checkout",
                lines,
                total => money(page.currency_symbol, total),
                token => page.token,
                checkout_url => page.checkout_url,
                cart_url => page.cart_url,
            },
        )
    }

    /// Payment page of one order
    pub fn order_payment(&self, order: &Order, currency_symbol: &str) -> Result<String, Error> {
        let lines: Vec<Value> = order
            .lines
            .iter()
            .map(|line: &OrderLine| {
                context! {
                    name => line.name(),
                    amount => money(currency_symbol, line.amount()),
                }
            })
            .collect();

        self.render(
            "order_pay.html",
            context! {
                title => format!("Order {}", order.id),
                order_id => order.id.as_str(),
                status => order.status.as_str(),
                lines,
                total => money(currency_symbol, order.total),
                awaiting_payment => order.status == OrderStatus::Pending,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cart_commerce::{OrderDraft, ProductId};
    use cart_catalog::Service;
    use cart_core::{NewCartItem, NoticeCode, SessionId};
    use rust_decimal_macros::dec;

    fn views() -> Views {
        Views::new().unwrap()
    }

    fn row(index: usize, title: &str) -> CartRow {
        CartRow {
            index,
            item: CartItem::from_new(NewCartItem::new(7, dec!(19.9))).unwrap(),
            title: title.into(),
            thumbnail_url: None,
            permalink: Some("/services/7".into()),
        }
    }

    fn page<'a>(rows: &'a [CartRow], notice: Option<Notice>) -> CartPage<'a> {
        CartPage {
            rows,
            total: rows.iter().map(|r| r.item.price).sum(),
            notice,
            remove_token: "rm",
            proceed_token: "go",
            currency_symbol: "$",
        }
    }

    #[test]
    fn test_money() {
        assert_eq!(money("$", dec!(19.9)), "$19.90");
        assert_eq!(money("€", dec!(0)), "€0.00");
    }

    #[test]
    fn test_empty_cart_page() {
        let html = views().cart_page(&page(&[], None)).unwrap();

        assert!(html.contains("Your service cart is empty."));
        assert!(!html.contains("/cart/checkout"));
        assert!(html.contains("<title>Service Cart</title>"));
    }

    #[test]
    fn test_cart_page_rows_and_forms() {
        let rows = vec![row(0, "Logo <Design>"), row(1, "SEO")];
        let html = views()
            .cart_page(&page(&rows, Some(Notice::new(NoticeCode::Added))))
            .unwrap();

        assert!(html.contains("notice-success"));
        assert!(html.contains("Service added to cart."));
        assert!(html.contains("Logo &lt;Design&gt;"));
        assert!(!html.contains("<Design>"));
        assert!(html.contains(r#"name="item_index" value="1""#));
        assert!(html.contains(r#"name="item_key""#));
        assert!(html.contains("$39.80"));
        assert!(html.contains(r#"action="/cart/checkout""#));
        assert!(html.contains(r#"<input type="hidden" name="_token" value="go">"#));
    }

    #[test]
    fn test_cart_link() {
        let views = views();
        let html = views
            .cart_link(&CartLink {
                url: "/cart",
                count: 3,
                class: "cart-link",
                show_icon: true,
                show_count: true,
            })
            .unwrap();
        assert!(html.contains(r#"<span class="cart-link-count">3</span>"#));
        assert!(html.contains(r#"aria-label="Cart (3)""#));
        assert!(html.contains("<svg"));

        let html = views
            .cart_link(&CartLink {
                url: "/cart",
                count: 0,
                class: "x",
                show_icon: false,
                show_count: false,
            })
            .unwrap();
        assert!(html.contains(r#"aria-label="Cart""#));
        assert!(!html.contains("cart-link-count"));
        assert!(!html.contains("<svg"));
    }

    #[test]
    fn test_cart_link_class_is_escaped() {
        let html = views()
            .cart_link(&CartLink {
                url: "/cart",
                count: 1,
                class: r#"x" onclick="alert(1)"#,
                show_icon: false,
                show_count: true,
            })
            .unwrap();

        assert!(!html.contains(r#"" onclick=""#));
        assert!(html.contains("&quot;"));
    }

    #[test]
    fn test_add_to_cart_button() {
        let html = views()
            .add_to_cart_button(&AddButton {
                service_id: 101,
                package_key: Some("premium"),
                addon_ids: &[1, 2],
                token: "tok",
                text: "Buy \"now\"",
                class: "button",
                cart_url: "/cart",
            })
            .unwrap();

        assert!(html.contains(r#"name="service_id" value="101""#));
        assert!(html.contains(r#"name="service_package" value="premium""#));
        assert!(html.contains(r#"name="service_addons[]" value="1""#));
        assert!(html.contains(r#"name="service_addons[]" value="2""#));
        assert!(html.contains(r#"<span class="btn-text">Buy &quot;now&quot;</span>"#));
    }

    #[test]
    fn test_button_without_package() {
        let html = views()
            .add_to_cart_button(&AddButton {
                service_id: 7,
                package_key: None,
                addon_ids: &[],
                token: "tok",
                text: "Add to cart",
                class: "button",
                cart_url: "/cart",
            })
            .unwrap();

        assert!(!html.contains("service_package"));
        assert!(!html.contains("service_addons[]"));
    }

    #[test]
    fn test_host_checkout_page() {
        let service = Service::new(7, "Logo Design", "/services/logo")
            .with_package("basic", "Basic", dec!(49));
        let item = CartItem::from_new(NewCartItem::new(7, dec!(42)).with_package("basic")).unwrap();
        let lines = vec![HostCartLine::new(ProductId(1), item, &service)];

        let html = views()
            .host_checkout(&HostCheckoutPage {
                lines: &lines,
                token: "place",
                checkout_url: "/checkout",
                cart_url: "/cart",
                currency_symbol: "$",
            })
            .unwrap();

        assert!(html.contains("Logo Design (Basic)"));
        assert!(html.contains("$42.00"));
        assert!(html.contains(r#"value="place""#));
        assert!(html.contains("Place order"));

        let html = views()
            .host_checkout(&HostCheckoutPage {
                lines: &[],
                token: "place",
                checkout_url: "/checkout",
                cart_url: "/cart",
                currency_symbol: "$",
            })
            .unwrap();
        assert!(html.contains("host-checkout-empty"));
        assert!(!html.contains("Place order"));
    }

    #[test]
    fn test_order_payment_page() {
        let item = CartItem::from_new(NewCartItem::new(7, dec!(15.5))).unwrap();
        let order = Order::from_draft(
            OrderDraft {
                session_id: SessionId::new(),
                lines: vec![OrderLine::Fee {
                    name: "Services Order".into(),
                    amount: dec!(15.5),
                }],
                snapshot: vec![item],
            },
            "/checkout",
        );

        let html = views().order_payment(&order, "$").unwrap();

        assert!(html.contains(order.id.as_str()));
        assert!(html.contains("Services Order"));
        assert!(html.contains("$15.50"));
        assert!(html.contains(r#"data-status="pending""#));
        assert!(html.contains("Awaiting payment confirmation."));
    }
}
