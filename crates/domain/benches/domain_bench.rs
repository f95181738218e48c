use chrono::Utc;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    Actor, Address, CreateOrderRequest, Money, NewOrder, OrderItem, OrderLine, OrderStatus,
    PaymentMethod, Product, ProductId, UserId, policy,
};

fn catalog(size: i64) -> Vec<Product> {
    (1..=size)
        .map(|id| Product {
            id: ProductId::new(id),
            seller_id: UserId::new(100 + id % 4),
            name: format!("Product {id}"),
            sku: format!("SKU-{id:03}"),
            description: Some("Benchmark product".to_string()),
            image: None,
            price: Money::from_cents(100 * id),
            stock: 1_000,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .collect()
}

fn request(catalog: &[Product]) -> CreateOrderRequest {
    CreateOrderRequest {
        items: catalog
            .iter()
            .map(|p| OrderLine {
                product_id: p.id,
                quantity: 2,
            })
            .collect(),
        shipping_address: Address {
            first_name: "Bench".into(),
            last_name: "Mark".into(),
            email: None,
            phone: None,
            street: "1 Loop Rd".into(),
            city: "Cupertino".into(),
            state: "CA".into(),
            country: "US".into(),
            postal_code: "95014".into(),
        },
        billing_address: None,
        payment_method: PaymentMethod::Card,
        tax: Money::from_cents(500),
        shipping: Money::from_cents(999),
        discount: Money::from_cents(100),
        notes: None,
    }
}

fn price_and_build(catalog: &[Product], req: &CreateOrderRequest) -> NewOrder {
    let items = req
        .items
        .iter()
        .zip(catalog)
        .map(|(line, product)| OrderItem::price_line(line, Some(product)).unwrap())
        .collect();
    NewOrder::build(UserId::new(1), req, items, Utc::now()).unwrap()
}

fn bench_price_order(c: &mut Criterion) {
    let catalog = catalog(10);
    let req = request(&catalog);

    c.bench_function("domain/price_and_build_10_lines", |b| {
        b.iter(|| price_and_build(&catalog, &req));
    });
}

fn bench_price_order_50(c: &mut Criterion) {
    let catalog = catalog(50);
    let req = request(&catalog);

    c.bench_function("domain/price_and_build_50_lines", |b| {
        b.iter(|| price_and_build(&catalog, &req));
    });
}

fn bench_transition_table(c: &mut Criterion) {
    c.bench_function("domain/transition_table_scan", |b| {
        b.iter(|| {
            let mut allowed = 0;
            for from in OrderStatus::ALL {
                for to in OrderStatus::ALL {
                    if from.can_transition_to(to) {
                        allowed += 1;
                    }
                }
            }
            allowed
        });
    });
}

fn bench_seller_authorization(c: &mut Criterion) {
    let catalog = catalog(50);
    let new_order = price_and_build(&catalog, &request(&catalog));
    let order = domain::Order {
        id: domain::OrderId::new(1),
        order_number: new_order.order_number,
        customer_id: new_order.customer_id,
        status: OrderStatus::Pending,
        payment_status: domain::PaymentStatus::Pending,
        payment_method: new_order.payment_method,
        payment_id: None,
        paid_at: None,
        subtotal: new_order.subtotal,
        tax: new_order.tax,
        shipping: new_order.shipping,
        discount: new_order.discount,
        total: new_order.total,
        shipping_address: new_order.shipping_address,
        billing_address: None,
        tracking_number: None,
        notes: None,
        internal_notes: None,
        items: new_order.items,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    let outsider = Actor::seller(999);

    c.bench_function("domain/authorize_seller_miss_50_lines", |b| {
        b.iter(|| {
            policy::authorize_order(&outsider, domain::Action::UpdateStatus, &order).is_err()
        });
    });
}

criterion_group!(
    benches,
    bench_price_order,
    bench_price_order_50,
    bench_transition_table,
    bench_seller_authorization
);
criterion_main!(benches);
