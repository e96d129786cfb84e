use async_trait::async_trait;
use mongodb::{Client, Collection};
use mongodb::bson::{self, doc, Document, oid::ObjectId};
use mongodb::options::{
    ClientOptions, ServerApi, ServerApiVersion, IndexOptions, FindOptions, FindOneOptions,
    FindOneAndUpdateOptions, ReturnDocument, UpdateOptions,
};
use mongodb::IndexModel;
use futures_util::TryStreamExt;

use crate::models::{
    Admin, Affiliate, AffiliateStatus, ApiError, CartData, DeliveryInfo, Order, OrderItem, Product, Referral, User,
};
use crate::models::affiliate::PayoutInfo;
use crate::models::product::UserPhoto;
use crate::traits::AffiliateStore;

#[derive(Clone)]
pub struct MongoDBService {
    users: Collection<User>,
    products: Collection<Product>,
    orders: Collection<Order>,
    admins: Collection<Admin>,
    affiliates: Collection<Affiliate>,
    referrals: Collection<Referral>,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn return_after() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build()
}

fn newest_first() -> FindOptions {
    FindOptions::builder().sort(doc! { "created_at": -1 }).build()
}

fn inserted_id(result: mongodb::results::InsertOneResult) -> Result<ObjectId, ApiError> {
    result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| ApiError::InternalError("Inserted document has no ObjectId".to_string()))
}

fn to_bson<T: serde::Serialize>(value: &T) -> Result<bson::Bson, ApiError> {
    bson::to_bson(value).map_err(|e| ApiError::InternalError(format!("Failed to serialize document: {}", e)))
}

async fn unique_index<T: Send + Sync>(collection: &Collection<T>, keys: Document) -> Result<(), mongodb::error::Error> {
    let options = IndexOptions::builder().unique(true).build();
    let model = IndexModel::builder().keys(keys).options(options).build();
    collection.create_index(model, None).await?;
    Ok(())
}

async fn plain_index<T: Send + Sync>(collection: &Collection<T>, keys: Document) -> Result<(), mongodb::error::Error> {
    let model = IndexModel::builder().keys(keys).build();
    collection.create_index(model, None).await?;
    Ok(())
}

impl MongoDBService {
    pub async fn init(uri: &str, database: &str) -> Result<Self, mongodb::error::Error> {
        // Parse options and configure client
        let mut client_options = ClientOptions::parse(uri).await?;

        // Set the server API version to V1
        let server_api = ServerApi::builder()
            .version(ServerApiVersion::V1)
            .build();
        client_options.server_api = Some(server_api);

        client_options.connect_timeout = Some(std::time::Duration::from_secs(10));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // Test connection
        client
            .database("admin")
            .run_command(doc! {"ping": 1}, None)
            .await?;

        log::info!("Successfully connected to MongoDB!");

        let db = client.database(database);
        let users = db.collection::<User>("users");
        let products = db.collection::<Product>("products");
        let orders = db.collection::<Order>("orders");
        let admins = db.collection::<Admin>("admins");
        let affiliates = db.collection::<Affiliate>("affiliates");
        let referrals = db.collection::<Referral>("referrals");

        unique_index(&users, doc! { "email": 1 }).await?;
        unique_index(&admins, doc! { "email": 1 }).await?;
        unique_index(&admins, doc! { "username": 1 }).await?;
        unique_index(&affiliates, doc! { "code": 1 }).await?;
        unique_index(&affiliates, doc! { "user_id": 1 }).await?;

        plain_index(&products, doc! { "is_active": 1, "category": 1, "created_at": -1 }).await?;
        plain_index(&orders, doc! { "user_id": 1, "created_at": -1 }).await?;
        plain_index(&referrals, doc! { "affiliate_id": 1, "created_at": -1 }).await?;
        plain_index(&referrals, doc! { "referred_user_id": 1, "type": 1 }).await?;
        plain_index(&referrals, doc! { "order_id": 1 }).await?;

        Ok(Self { users, products, orders, admins, affiliates, referrals })
    }

    // ---- users ----

    pub async fn create_user(&self, mut user: User) -> Result<User, ApiError> {
        if user.email.trim().is_empty() {
            return Err(ApiError::ValidationError("Email cannot be empty".to_string()));
        }

        if self.get_user_by_email(&user.email).await?.is_some() {
            return Err(ApiError::DuplicateError(format!("An account with email {} already exists", user.email)));
        }

        let result = self.users
            .insert_one(&user, None)
            .await
            .map_err(ApiError::DatabaseError)?;
        user.id = Some(inserted_id(result)?);
        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        self.users
            .find_one(doc! { "email": email.trim().to_lowercase() }, None)
            .await
            .map_err(ApiError::DatabaseError)
    }

    pub async fn get_user(&self, id: &ObjectId) -> Result<Option<User>, ApiError> {
        self.users
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(ApiError::DatabaseError)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.users
            .find(None, newest_first())
            .await
            .map_err(ApiError::DatabaseError)?
            .try_collect()
            .await
            .map_err(ApiError::DatabaseError)
    }

    pub async fn update_user_profile(
        &self,
        id: &ObjectId,
        name: Option<String>,
        delivery_info: Option<DeliveryInfo>,
    ) -> Result<User, ApiError> {
        let mut set = Document::new();
        if let Some(name) = name {
            set.insert("name", name);
        }
        if let Some(info) = delivery_info {
            set.insert("delivery_info", to_bson(&info)?);
        }
        if set.is_empty() {
            return self.get_user(id).await?
                .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)));
        }

        self.users
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set }, return_after())
            .await
            .map_err(ApiError::DatabaseError)?
            .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))
    }

    pub async fn set_cart(&self, id: &ObjectId, cart: &CartData) -> Result<(), ApiError> {
        let result = self.users
            .update_one(doc! { "_id": id }, doc! { "$set": { "cart_data": to_bson(cart)? } }, None)
            .await
            .map_err(ApiError::DatabaseError)?;
        if result.matched_count == 0 {
            return Err(ApiError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }

    pub async fn clear_cart(&self, id: &ObjectId) -> Result<(), ApiError> {
        self.set_cart(id, &CartData::new()).await
    }

    pub async fn set_favorites(&self, id: &ObjectId, favorites: &[String]) -> Result<(), ApiError> {
        self.users
            .update_one(doc! { "_id": id }, doc! { "$set": { "favorites": favorites } }, None)
            .await
            .map_err(ApiError::DatabaseError)?;
        Ok(())
    }

    // ---- products ----

    pub async fn create_product(&self, mut product: Product) -> Result<Product, ApiError> {
        let result = self.products
            .insert_one(&product, None)
            .await
            .map_err(ApiError::DatabaseError)?;
        product.id = Some(inserted_id(result)?);
        Ok(product)
    }

    pub async fn get_product(&self, id: &ObjectId) -> Result<Option<Product>, ApiError> {
        self.products
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(ApiError::DatabaseError)
    }

    pub async fn get_products_by_ids(&self, ids: Vec<ObjectId>) -> Result<Vec<Product>, ApiError> {
        self.products
            .find(doc! { "_id": { "$in": ids } }, None)
            .await
            .map_err(ApiError::DatabaseError)?
            .try_collect()
            .await
            .map_err(ApiError::DatabaseError)
    }

    pub async fn list_products(
        &self,
        active_only: bool,
        category: Option<&str>,
        bestseller: Option<bool>,
    ) -> Result<Vec<Product>, ApiError> {
        let mut filter = Document::new();
        if active_only {
            filter.insert("is_active", true);
        }
        if let Some(category) = category {
            filter.insert("category", category);
        }
        if let Some(bestseller) = bestseller {
            filter.insert("bestseller", bestseller);
        }
        self.products
            .find(filter, newest_first())
            .await
            .map_err(ApiError::DatabaseError)?
            .try_collect()
            .await
            .map_err(ApiError::DatabaseError)
    }

    pub async fn replace_product(&self, product: &Product) -> Result<(), ApiError> {
        let id = product.id
            .ok_or_else(|| ApiError::InternalError("Cannot save a product without id".to_string()))?;
        let result = self.products
            .replace_one(doc! { "_id": id }, product, None)
            .await
            .map_err(ApiError::DatabaseError)?;
        if result.matched_count == 0 {
            return Err(ApiError::NotFound(format!("Product {} not found", id)));
        }
        Ok(())
    }

    pub async fn delete_product(&self, id: &ObjectId) -> Result<bool, ApiError> {
        let result = self.products
            .delete_one(doc! { "_id": id }, None)
            .await
            .map_err(ApiError::DatabaseError)?;
        Ok(result.deleted_count > 0)
    }

    pub async fn set_product_active(&self, id: &ObjectId, active: bool) -> Result<Option<Product>, ApiError> {
        self.products
            .find_one_and_update(
                doc! { "_id": id },
                doc! { "$set": { "is_active": active, "updated_at": now_millis() } },
                return_after(),
            )
            .await
            .map_err(ApiError::DatabaseError)
    }

    /// Writes reviews and the derived rating fields together.
    pub async fn save_reviews(&self, product: &Product) -> Result<(), ApiError> {
        let id = product.id
            .ok_or_else(|| ApiError::InternalError("Cannot save reviews without product id".to_string()))?;
        self.products
            .update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "reviews": to_bson(&product.reviews)?,
                    "average_rating": product.average_rating,
                    "review_count": product.review_count as i64,
                }},
                None,
            )
            .await
            .map_err(ApiError::DatabaseError)?;
        Ok(())
    }

    pub async fn add_user_photo(&self, product_id: &ObjectId, photo: &UserPhoto) -> Result<bool, ApiError> {
        let result = self.products
            .update_one(doc! { "_id": product_id }, doc! { "$push": { "user_photos": to_bson(photo)? } }, None)
            .await
            .map_err(ApiError::DatabaseError)?;
        Ok(result.matched_count > 0)
    }

    pub async fn remove_user_photo(&self, product_id: &ObjectId, photo_id: &ObjectId) -> Result<bool, ApiError> {
        let result = self.products
            .update_one(doc! { "_id": product_id }, doc! { "$pull": { "user_photos": { "_id": photo_id } } }, None)
            .await
            .map_err(ApiError::DatabaseError)?;
        Ok(result.modified_count > 0)
    }

    /// Decrements one variant's stock if at least `delta` units remain.
    async fn adjust_stock(&self, item: &OrderItem, delta: i64) -> Result<bool, ApiError> {
        let product_id = ObjectId::parse_str(&item.product_id)
            .map_err(|_| ApiError::ValidationError(format!("Invalid product id {}", item.product_id)))?;

        let mut size_match = doc! { "size": item.size.as_str() };
        if delta < 0 {
            size_match.insert("quantity", doc! { "$gte": -delta });
        }
        let filter = doc! {
            "_id": product_id,
            "colors": { "$elemMatch": {
                "color_hex": item.color_hex.as_str(),
                "sizes": { "$elemMatch": size_match },
            }},
        };
        let options = UpdateOptions::builder()
            .array_filters(vec![
                doc! { "c.color_hex": item.color_hex.as_str() },
                doc! { "s.size": item.size.as_str() },
            ])
            .build();

        let result = self.products
            .update_one(filter, doc! { "$inc": { "colors.$[c].sizes.$[s].quantity": delta } }, options)
            .await
            .map_err(ApiError::DatabaseError)?;
        Ok(result.modified_count > 0)
    }

    /// Takes every item out of stock, or none of them.
    pub async fn reserve_stock(&self, items: &[OrderItem]) -> Result<(), ApiError> {
        for (index, item) in items.iter().enumerate() {
            if !self.adjust_stock(item, -(item.quantity as i64)).await? {
                log::warn!("Stock ran out for {} ({} {}) while reserving", item.name, item.size, item.color_name);
                self.release_stock(&items[..index]).await;
                return Err(ApiError::ValidationError(format!(
                    "{} (size {}) just sold out, please update your cart", item.name, item.size
                )));
            }
        }
        Ok(())
    }

    pub async fn release_stock(&self, items: &[OrderItem]) {
        for item in items {
            if let Err(e) = self.adjust_stock(item, item.quantity as i64).await {
                log::error!("Failed to return {} x {} to stock: {}", item.quantity, item.name, e);
            }
        }
    }

    // ---- orders ----

    pub async fn create_order(&self, mut order: Order) -> Result<Order, ApiError> {
        let result = self.orders
            .insert_one(&order, None)
            .await
            .map_err(ApiError::DatabaseError)?;
        order.id = Some(inserted_id(result)?);
        Ok(order)
    }

    pub async fn get_orders_for_user(&self, user_id: &ObjectId) -> Result<Vec<Order>, ApiError> {
        self.orders
            .find(doc! { "user_id": user_id }, newest_first())
            .await
            .map_err(ApiError::DatabaseError)?
            .try_collect()
            .await
            .map_err(ApiError::DatabaseError)
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>, ApiError> {
        self.orders
            .find(None, newest_first())
            .await
            .map_err(ApiError::DatabaseError)?
            .try_collect()
            .await
            .map_err(ApiError::DatabaseError)
    }

    pub async fn update_order_status(&self, id: &ObjectId, status: &str) -> Result<Option<Order>, ApiError> {
        self.orders
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": { "status": status } }, return_after())
            .await
            .map_err(ApiError::DatabaseError)
    }

    /// Returns the order as it was before the change.
    pub async fn update_order_payment(&self, id: &ObjectId, paid: bool) -> Result<Option<Order>, ApiError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .build();
        self.orders
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": { "payment": paid } }, options)
            .await
            .map_err(ApiError::DatabaseError)
    }

    // ---- admins ----

    pub async fn count_admins(&self) -> Result<u64, ApiError> {
        self.admins
            .count_documents(None, None)
            .await
            .map_err(ApiError::DatabaseError)
    }

    pub async fn create_admin(&self, mut admin: Admin) -> Result<Admin, ApiError> {
        if self.find_admin_by_login(&admin.username).await?.is_some()
            || self.find_admin_by_login(&admin.email).await?.is_some()
        {
            return Err(ApiError::DuplicateError("An admin with this username or email already exists".to_string()));
        }
        admin.apply_role_permissions();
        let result = self.admins
            .insert_one(&admin, None)
            .await
            .map_err(ApiError::DatabaseError)?;
        admin.id = Some(inserted_id(result)?);
        Ok(admin)
    }

    /// Matches on username or email.
    pub async fn find_admin_by_login(&self, login: &str) -> Result<Option<Admin>, ApiError> {
        let login = login.trim();
        self.admins
            .find_one(doc! { "$or": [ { "username": login }, { "email": login.to_lowercase() } ] }, None)
            .await
            .map_err(ApiError::DatabaseError)
    }

    pub async fn get_admin(&self, id: &ObjectId) -> Result<Option<Admin>, ApiError> {
        self.admins
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(ApiError::DatabaseError)
    }

    pub async fn list_admins(&self) -> Result<Vec<Admin>, ApiError> {
        self.admins
            .find(None, newest_first())
            .await
            .map_err(ApiError::DatabaseError)?
            .try_collect()
            .await
            .map_err(ApiError::DatabaseError)
    }

    pub async fn save_admin(&self, admin: &mut Admin) -> Result<(), ApiError> {
        let id = admin.id
            .ok_or_else(|| ApiError::InternalError("Cannot save an admin without id".to_string()))?;
        admin.apply_role_permissions();
        self.admins
            .replace_one(doc! { "_id": id }, &*admin, None)
            .await
            .map_err(ApiError::DatabaseError)?;
        Ok(())
    }

    pub async fn delete_admin(&self, id: &ObjectId) -> Result<bool, ApiError> {
        let result = self.admins
            .delete_one(doc! { "_id": id }, None)
            .await
            .map_err(ApiError::DatabaseError)?;
        Ok(result.deleted_count > 0)
    }

    pub async fn touch_admin_login(&self, id: &ObjectId) -> Result<(), ApiError> {
        self.admins
            .update_one(doc! { "_id": id }, doc! { "$set": { "last_login": now_millis() } }, None)
            .await
            .map_err(ApiError::DatabaseError)?;
        Ok(())
    }
}

#[async_trait]
impl AffiliateStore for MongoDBService {
    async fn insert_affiliate(&self, mut affiliate: Affiliate) -> Result<Affiliate, ApiError> {
        let result = self.affiliates
            .insert_one(&affiliate, None)
            .await
            .map_err(ApiError::DatabaseError)?;
        affiliate.id = Some(inserted_id(result)?);
        Ok(affiliate)
    }

    async fn find_affiliate_by_id(&self, id: &ObjectId) -> Result<Option<Affiliate>, ApiError> {
        self.affiliates
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(ApiError::DatabaseError)
    }

    async fn find_affiliate_by_user(&self, user_id: &ObjectId) -> Result<Option<Affiliate>, ApiError> {
        self.affiliates
            .find_one(doc! { "user_id": user_id }, None)
            .await
            .map_err(ApiError::DatabaseError)
    }

    async fn find_affiliate_by_code(&self, code: &str) -> Result<Option<Affiliate>, ApiError> {
        self.affiliates
            .find_one(doc! { "code": code }, None)
            .await
            .map_err(ApiError::DatabaseError)
    }

    async fn list_affiliates(&self, status: Option<AffiliateStatus>) -> Result<Vec<Affiliate>, ApiError> {
        let filter = status.map(|s| doc! { "status": s.to_string() });
        self.affiliates
            .find(filter, newest_first())
            .await
            .map_err(ApiError::DatabaseError)?
            .try_collect()
            .await
            .map_err(ApiError::DatabaseError)
    }

    async fn increment_clicks(&self, id: &ObjectId) -> Result<(), ApiError> {
        self.affiliates
            .update_one(
                doc! { "_id": id },
                doc! { "$inc": { "stats.total_clicks": 1_i64 }, "$set": { "updated_at": now_millis() } },
                None,
            )
            .await
            .map_err(ApiError::DatabaseError)?;
        Ok(())
    }

    async fn increment_signups(&self, id: &ObjectId) -> Result<Option<Affiliate>, ApiError> {
        self.affiliates
            .find_one_and_update(
                doc! { "_id": id },
                doc! { "$inc": { "stats.total_signups": 1_i64 }, "$set": { "updated_at": now_millis() } },
                return_after(),
            )
            .await
            .map_err(ApiError::DatabaseError)
    }

    async fn set_conversion_rate(&self, id: &ObjectId, rate: f64) -> Result<(), ApiError> {
        self.affiliates
            .update_one(doc! { "_id": id }, doc! { "$set": { "stats.conversion_rate": rate } }, None)
            .await
            .map_err(ApiError::DatabaseError)?;
        Ok(())
    }

    async fn record_sale(&self, id: &ObjectId, commission: f64) -> Result<Option<Affiliate>, ApiError> {
        self.affiliates
            .find_one_and_update(
                doc! { "_id": id },
                doc! {
                    "$inc": {
                        "stats.total_sales": 1_i64,
                        "stats.total_earnings": commission,
                        "next_payout_amount": commission,
                    },
                    "$set": { "updated_at": now_millis() },
                },
                return_after(),
            )
            .await
            .map_err(ApiError::DatabaseError)
    }

    async fn set_commission_rate(&self, id: &ObjectId, rate: f64) -> Result<(), ApiError> {
        self.affiliates
            .update_one(doc! { "_id": id }, doc! { "$set": { "commission_rate": rate } }, None)
            .await
            .map_err(ApiError::DatabaseError)?;
        Ok(())
    }

    async fn update_affiliate_status(
        &self,
        id: &ObjectId,
        status: AffiliateStatus,
        approved_by: Option<ObjectId>,
        rejection_reason: Option<String>,
    ) -> Result<Option<Affiliate>, ApiError> {
        let now = now_millis();
        let mut set = doc! {
            "status": status.to_string(),
            "rejection_reason": rejection_reason,
            "updated_at": now,
        };
        if let Some(admin_id) = approved_by {
            set.insert("approved_by", admin_id);
            set.insert("approved_at", now);
        }
        self.affiliates
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set }, return_after())
            .await
            .map_err(ApiError::DatabaseError)
    }

    async fn set_affiliate_active(&self, id: &ObjectId, active: bool) -> Result<Option<Affiliate>, ApiError> {
        self.affiliates
            .find_one_and_update(
                doc! { "_id": id },
                doc! { "$set": { "is_active": active, "updated_at": now_millis() } },
                return_after(),
            )
            .await
            .map_err(ApiError::DatabaseError)
    }

    async fn update_payout_info(&self, id: &ObjectId, info: PayoutInfo) -> Result<Option<Affiliate>, ApiError> {
        self.affiliates
            .find_one_and_update(
                doc! { "_id": id },
                doc! { "$set": { "payment_info": to_bson(&info)?, "updated_at": now_millis() } },
                return_after(),
            )
            .await
            .map_err(ApiError::DatabaseError)
    }

    async fn record_payout(&self, id: &ObjectId, amount: f64) -> Result<Option<Affiliate>, ApiError> {
        let now = now_millis();
        self.affiliates
            .find_one_and_update(
                doc! { "_id": id },
                doc! {
                    "$inc": { "next_payout_amount": -amount, "total_paid_out": amount },
                    "$set": { "last_payout_at": now, "updated_at": now },
                },
                return_after(),
            )
            .await
            .map_err(ApiError::DatabaseError)
    }

    async fn insert_referral(&self, mut referral: Referral) -> Result<Referral, ApiError> {
        let result = self.referrals
            .insert_one(&referral, None)
            .await
            .map_err(ApiError::DatabaseError)?;
        referral.id = Some(inserted_id(result)?);
        Ok(referral)
    }

    async fn find_latest_confirmed_signup(&self, user_id: &ObjectId) -> Result<Option<Referral>, ApiError> {
        let options = FindOneOptions::builder().sort(doc! { "created_at": -1 }).build();
        self.referrals
            .find_one(
                doc! { "referred_user_id": user_id, "type": "signup", "status": "confirmed" },
                options,
            )
            .await
            .map_err(ApiError::DatabaseError)
    }

    async fn find_purchase_for_order(&self, order_id: &ObjectId) -> Result<Option<Referral>, ApiError> {
        self.referrals
            .find_one(doc! { "order_id": order_id, "type": "purchase" }, None)
            .await
            .map_err(ApiError::DatabaseError)
    }

    async fn list_referrals(&self, affiliate_id: &ObjectId, limit: i64) -> Result<Vec<Referral>, ApiError> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .limit(limit)
            .build();
        self.referrals
            .find(doc! { "affiliate_id": affiliate_id }, options)
            .await
            .map_err(ApiError::DatabaseError)?
            .try_collect()
            .await
            .map_err(ApiError::DatabaseError)
    }
}
