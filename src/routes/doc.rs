use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    domain::{CouponClass, DiscountType, OrderStatus, PaymentMethod, StockChangeType},
    dto::{
        addresses::{AddressList, AddressRequest},
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        coupons::{CouponList, CouponQuote, CreateCouponRequest, ValidateCouponRequest},
        inventory::{
            BulkStockRequest, BulkStockResult, SetStockRequest, SizeList, StockChange,
            StockHistoryList, StockUpdate,
        },
        orders::{
            OrderLineRequest, OrderList, OrderWithItems, PlaceOrderRequest, PlacedOrder,
            UpdateOrderStatusRequest,
        },
        products::{
            CreateProductRequest, CreateSizeRequest, ProductList, UpdateProductRequest,
            UpdateSizeRequest,
        },
    },
    models::{
        Address, Coupon, Order, OrderItem, Product, ProductSize, ProductWithSizes,
        StockHistoryEntry, User,
    },
    response::{ApiResponse, Meta},
    routes::{addresses, auth, coupons, health, orders, params, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::add_size,
        products::update_size,
        products::set_stock,
        products::bulk_update_stock,
        products::stock_history,
        products::list_low_stock,
        orders::place_order,
        orders::list_orders,
        orders::get_order,
        orders::list_all_orders,
        orders::get_order_admin,
        orders::update_order_status,
        coupons::validate_coupon,
        coupons::create_coupon,
        coupons::list_coupons,
        addresses::list_addresses,
        addresses::create_address,
        addresses::update_address,
        addresses::delete_address
    ),
    components(
        schemas(
            User,
            Product,
            ProductSize,
            ProductWithSizes,
            Order,
            OrderItem,
            StockHistoryEntry,
            Coupon,
            Address,
            OrderStatus,
            PaymentMethod,
            StockChangeType,
            DiscountType,
            CouponClass,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateProductRequest,
            UpdateProductRequest,
            CreateSizeRequest,
            UpdateSizeRequest,
            ProductList,
            SetStockRequest,
            StockUpdate,
            BulkStockRequest,
            StockChange,
            BulkStockResult,
            SizeList,
            StockHistoryList,
            OrderLineRequest,
            PlaceOrderRequest,
            PlacedOrder,
            UpdateOrderStatusRequest,
            OrderWithItems,
            OrderList,
            ValidateCouponRequest,
            CouponQuote,
            CreateCouponRequest,
            CouponList,
            AddressRequest,
            AddressList,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<PlacedOrder>,
            ApiResponse<ProductWithSizes>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<StockChange>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and login"),
        (name = "Products", description = "Juice catalog"),
        (name = "Inventory", description = "Stock levels and the stock ledger"),
        (name = "Orders", description = "Order placement and history"),
        (name = "Admin", description = "Order administration"),
        (name = "Coupons", description = "Coupon validation and management"),
        (name = "Addresses", description = "Saved delivery addresses"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
