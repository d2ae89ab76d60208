//! Request → ordered action list.
//!
//! Every operation is pure: it validates its request and returns the complete
//! action list or an error, without touching the network.

use crate::certify::payload::{AddSigner, CertSigner, CreateCert, CreateEntity, DeleteCert, Members, SignCert};
use crate::certify::types::{
    AddSignersRequest, BuildError, BuildResult, CertificateRef, CreateAccountRequest,
    CreateCertificateRequest, CreateEntityRequest, CreateMultipleRequest, EntityKind, MemberRef,
    SignCertificateRequest, SignerInput,
};
use crate::chain::action::{Action, ActionName, PermissionLevel};
use crate::chain::keys::{KeyPair, PublicKey};
use crate::chain::system::{Authority, BuyRamBytes, DelegateBw, NewAccount};
use crate::chain::types::{Asset, Name};

/// RAM bought for every new account.
pub const NEW_ACCOUNT_RAM_BYTES: u32 = 3048;

/// Actions for a new account plus the generated key pair. The private key is
/// returned to the caller once and never kept.
#[derive(Debug)]
pub struct AccountCreation {
    pub account: Name,
    pub actions: Vec<Action>,
    pub keys: KeyPair,
}

fn require<T>(value: Option<T>, field: &str) -> BuildResult<T> {
    value.ok_or_else(|| BuildError::Validation(format!("Valid {} has not been provided.", field)))
}

fn parse_name(raw: &str, field: &str) -> BuildResult<Name> {
    raw.trim()
        .parse()
        .map_err(|_| BuildError::Validation(format!("'{}' is not a valid account name for {}.", raw, field)))
}

#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    contract: Name,
    stake: Asset,
}

impl TransactionBuilder {
    pub fn new(contract: Name, stake: Asset) -> Self {
        Self { contract, stake }
    }

    pub fn contract(&self) -> Name {
        self.contract
    }

    fn contract_auth(&self) -> Vec<PermissionLevel> {
        vec![PermissionLevel::active(self.contract)]
    }

    fn contract_action<P>(&self, name: ActionName, payload: &P) -> BuildResult<Action>
    where
        P: serde::Serialize + crate::chain::serialize::Pack,
    {
        Ok(Action::new(self.contract, name, self.contract_auth(), payload)?)
    }

    fn entity_action(&self, kind: EntityKind, request: &CreateEntityRequest) -> BuildResult<Action> {
        let payload = CreateEntity {
            id: require(request.id, kind.owner_param())?,
            name: require(request.name.clone(), kind.name_param())?,
        };
        let name = match kind {
            EntityKind::Institution => ActionName::CreateInst,
            EntityKind::Corporate => ActionName::CreateCorp,
        };
        self.contract_action(name, &payload)
    }

    fn members(kind: EntityKind, raw: &[MemberRef]) -> BuildResult<Members> {
        match kind {
            EntityKind::Institution => raw
                .iter()
                .map(|m| match m {
                    MemberRef::Name(n) => parse_name(n, "participants"),
                    MemberRef::Id(id) => Err(BuildError::Validation(format!(
                        "Participant {} must be an account name.",
                        id
                    ))),
                })
                .collect::<BuildResult<Vec<_>>>()
                .map(Members::Names),
            EntityKind::Corporate => raw
                .iter()
                .map(|m| match m {
                    MemberRef::Id(id) => Ok(*id),
                    MemberRef::Name(s) => s.trim().parse().map_err(|_| {
                        BuildError::Validation(format!("Assignee '{}' must be a numeric id.", s))
                    }),
                })
                .collect::<BuildResult<Vec<_>>>()
                .map(Members::Ids),
        }
    }

    fn certificate_action(&self, kind: EntityKind, request: &CreateCertificateRequest) -> BuildResult<Action> {
        let members_param = match kind {
            EntityKind::Institution => "participants",
            EntityKind::Corporate => "assignees",
        };
        let title_param = match kind {
            EntityKind::Institution => "certificateName",
            EntityKind::Corporate => "template",
        };
        let payload = CreateCert {
            kind,
            id: require(request.certificate_id, "certificateId")?,
            owner_id: require(request.owner_id, kind.owner_param())?,
            title: require(request.title.clone(), title_param)?,
            members: Self::members(kind, require(request.members.as_deref(), members_param)?)?,
        };
        self.contract_action(ActionName::CreateCert, &payload)
    }

    fn signers_action(
        &self,
        kind: EntityKind,
        certificate_id: u64,
        owner_id: u64,
        signers: &[SignerInput],
    ) -> BuildResult<Action> {
        let signers = signers
            .iter()
            .map(|s| {
                Ok(CertSigner {
                    name: parse_name(s.name(), "signers")?,
                    issigned: s.issigned(),
                })
            })
            .collect::<BuildResult<Vec<_>>>()?;
        let payload = AddSigner { kind, id: certificate_id, owner_id, signers };
        self.contract_action(ActionName::AddSigner, &payload)
    }

    /// `[createinst]` or `[createcorp]`.
    pub fn create_entity(&self, kind: EntityKind, request: &CreateEntityRequest) -> BuildResult<Vec<Action>> {
        Ok(vec![self.entity_action(kind, request)?])
    }

    /// `[createcert]`, members in the order given.
    pub fn create_certificate(
        &self,
        kind: EntityKind,
        request: &CreateCertificateRequest,
    ) -> BuildResult<Vec<Action>> {
        Ok(vec![self.certificate_action(kind, request)?])
    }

    /// `[deletecert]`.
    pub fn delete_certificate(&self, kind: EntityKind, request: &CertificateRef) -> BuildResult<Vec<Action>> {
        let payload = DeleteCert {
            kind,
            id: require(request.certificate_id, "certificateId")?,
            owner_id: require(request.owner_id, kind.owner_param())?,
        };
        Ok(vec![self.contract_action(ActionName::DeleteCert, &payload)?])
    }

    /// `[addsigner]`.
    pub fn add_signers(&self, kind: EntityKind, request: &AddSignersRequest) -> BuildResult<Vec<Action>> {
        let certificate_id = require(request.certificate_id, "certificateId")?;
        let owner_id = require(request.owner_id, kind.owner_param())?;
        let signers = require(request.signers.as_deref(), "signers")?;
        if signers.is_empty() {
            return Err(BuildError::Validation("Valid signers have not been provided.".to_string()));
        }
        Ok(vec![self.signers_action(kind, certificate_id, owner_id, signers)?])
    }

    /// `[signcert]`, authorized by the contract and the signer.
    pub fn sign_certificate(
        &self,
        kind: EntityKind,
        request: &SignCertificateRequest,
    ) -> BuildResult<Vec<Action>> {
        let signer = parse_name(require(request.signer.as_deref(), "signer")?, "signer")?;
        let payload = SignCert {
            kind,
            id: require(request.certificate_id, "certificateId")?,
            owner_id: require(request.owner_id, kind.owner_param())?,
            signer,
        };
        let authorization = vec![
            PermissionLevel::active(self.contract),
            PermissionLevel::active(signer),
        ];
        Ok(vec![Action::new(self.contract, ActionName::SignCert, authorization, &payload)?])
    }

    /// `newaccount`, `buyrambytes`, `delegatebw` on `eosio`, paid by the contract account.
    pub fn create_account_with_key(&self, account: Name, key: PublicKey) -> BuildResult<Vec<Action>> {
        let auth = self.contract_auth();
        Ok(vec![
            Action::new(
                Name::EOSIO,
                ActionName::NewAccount,
                auth.clone(),
                &NewAccount {
                    creator: self.contract,
                    name: account,
                    owner: Authority::single_key(key),
                    active: Authority::single_key(key),
                },
            )?,
            Action::new(
                Name::EOSIO,
                ActionName::BuyRamBytes,
                auth.clone(),
                &BuyRamBytes {
                    payer: self.contract,
                    receiver: account,
                    bytes: NEW_ACCOUNT_RAM_BYTES,
                },
            )?,
            Action::new(
                Name::EOSIO,
                ActionName::DelegateBw,
                auth,
                &DelegateBw {
                    from: self.contract,
                    receiver: account,
                    stake_net_quantity: self.stake.clone(),
                    stake_cpu_quantity: self.stake.clone(),
                    transfer: false,
                },
            )?,
        ])
    }

    /// Account creation with a freshly generated key pair.
    pub fn create_account(&self, request: &CreateAccountRequest) -> BuildResult<AccountCreation> {
        let account = parse_name(require(request.account_name.as_deref(), "accountName")?, "accountName")?;
        let keys = KeyPair::generate();
        let actions = self.create_account_with_key(account, keys.public_key)?;
        Ok(AccountCreation { account, actions, keys })
    }

    /// Up to three actions in order entity, certificate, signers. Signers take
    /// their certificate and owner ids from the certificate group.
    pub fn create_multiple(&self, kind: EntityKind, request: &CreateMultipleRequest) -> BuildResult<Vec<Action>> {
        let mut actions = Vec::with_capacity(3);

        if let Some(entity) = &request.institution {
            actions.push(self.entity_action(kind, entity)?);
        }
        if let Some(certificate) = &request.certificate {
            actions.push(self.certificate_action(kind, certificate)?);
        }
        if let Some(signers) = request.signers.as_deref().filter(|s| !s.is_empty()) {
            let certificate = request.certificate.as_ref().ok_or_else(|| {
                BuildError::MissingDependency(
                    "Signers can only be added together with a certificate.".to_string(),
                )
            })?;
            let certificate_id = require(certificate.certificate_id, "certificateId")?;
            let owner_id = require(certificate.owner_id, kind.owner_param())?;
            actions.push(self.signers_action(kind, certificate_id, owner_id, signers)?);
        }

        if actions.is_empty() {
            return Err(BuildError::Validation("Nothing to create.".to_string()));
        }
        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn builder() -> TransactionBuilder {
        TransactionBuilder::new("certify".parse().unwrap(), "0.0001 EOS".parse().unwrap())
    }

    fn certificate(kind: EntityKind) -> CreateCertificateRequest {
        let body = match kind {
            EntityKind::Institution => json!({
                "certificateId": 10, "institutionId": 1,
                "certificateName": "Rust", "participants": ["bob", "alice"]
            }),
            EntityKind::Corporate => json!({
                "certificateId": 10, "corporateId": 1,
                "template": "Rust", "assignees": [9, 3]
            }),
        };
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_create_entity_per_kind() {
        let req: CreateEntityRequest =
            serde_json::from_value(json!({"institutionId": 1, "institutionName": "Uni"})).unwrap();

        let inst = builder().create_entity(EntityKind::Institution, &req).unwrap();
        assert_eq!(inst.len(), 1);
        assert_eq!(inst[0].name, ActionName::CreateInst);
        assert_eq!(inst[0].data, json!({"id": 1, "name": "Uni"}));
        assert_eq!(inst[0].authorization, vec![PermissionLevel::active("certify".parse().unwrap())]);

        let corp = builder().create_entity(EntityKind::Corporate, &req).unwrap();
        assert_eq!(corp[0].name, ActionName::CreateCorp);
    }

    #[test]
    fn test_missing_field_is_validation() {
        let req = CreateEntityRequest { id: Some(1), name: None };
        let err = builder().create_entity(EntityKind::Corporate, &req).unwrap_err();
        assert!(matches!(err, BuildError::Validation(ref m) if m.contains("corporateName")));
    }

    #[test]
    fn test_certificate_members_keep_order() {
        let actions = builder()
            .create_certificate(EntityKind::Institution, &certificate(EntityKind::Institution))
            .unwrap();
        assert_eq!(actions[0].data["participants"], json!(["bob", "alice"]));

        let actions = builder()
            .create_certificate(EntityKind::Corporate, &certificate(EntityKind::Corporate))
            .unwrap();
        assert_eq!(actions[0].data["assignees"], json!([9, 3]));
        assert_eq!(actions[0].data["certtemplate"], json!("Rust"));
    }

    #[test]
    fn test_invalid_participant_name() {
        let mut req = certificate(EntityKind::Institution);
        req.members = Some(vec![MemberRef::Name("Not Valid".to_string())]);
        let err = builder().create_certificate(EntityKind::Institution, &req).unwrap_err();
        assert!(matches!(err, BuildError::Validation(_)));
    }

    #[test]
    fn test_sign_certificate_authorization() {
        let req: SignCertificateRequest = serde_json::from_value(json!({
            "signer": "alice", "certificateId": 10, "institutionId": 1, "signerPrivate": "x"
        }))
        .unwrap();
        let actions = builder().sign_certificate(EntityKind::Institution, &req).unwrap();
        let alice: Name = "alice".parse().unwrap();
        assert_eq!(actions[0].authorization[1], PermissionLevel::active(alice));
        assert_eq!(actions[0].data, json!({"id": 10, "institutionid": 1, "signerr": "alice"}));
    }

    #[test]
    fn test_create_account_actions() {
        let req = CreateAccountRequest { account_name: Some("newuser".to_string()) };
        let creation = builder().create_account(&req).unwrap();
        let names: Vec<_> = creation.actions.iter().map(|a| a.name).collect();
        assert_eq!(
            names,
            vec![ActionName::NewAccount, ActionName::BuyRamBytes, ActionName::DelegateBw]
        );
        assert!(creation.actions.iter().all(|a| a.account == Name::EOSIO));
        assert_eq!(creation.actions[1].data["bytes"], json!(3048));
        assert_eq!(creation.actions[2].data["stake_cpu_quantity"], json!("0.0001 EOS"));
        assert_eq!(creation.actions[2].data["transfer"], json!(false));
        assert_eq!(
            creation.actions[0].data["owner"]["keys"][0]["key"],
            json!(creation.keys.public_key.to_string())
        );
    }

    #[test]
    fn test_create_multiple_order() {
        let req = CreateMultipleRequest {
            institution: Some(CreateEntityRequest { id: Some(1), name: Some("Uni".to_string()) }),
            certificate: Some(certificate(EntityKind::Institution)),
            signers: Some(vec![SignerInput::Name("carol".to_string())]),
        };
        let actions = builder().create_multiple(EntityKind::Institution, &req).unwrap();
        let names: Vec<_> = actions.iter().map(|a| a.name).collect();
        assert_eq!(names, vec![ActionName::CreateInst, ActionName::CreateCert, ActionName::AddSigner]);
        assert_eq!(actions[2].data["id"], json!(10));
        assert_eq!(actions[2].data["signers"], json!([{"name": "carol", "issigned": false}]));
    }

    #[test]
    fn test_create_multiple_signers_need_certificate() {
        let req = CreateMultipleRequest {
            signers: Some(vec![SignerInput::Name("carol".to_string())]),
            ..Default::default()
        };
        let err = builder().create_multiple(EntityKind::Institution, &req).unwrap_err();
        assert!(matches!(err, BuildError::MissingDependency(_)));
    }

    #[test]
    fn test_create_multiple_empty() {
        let req = CreateMultipleRequest { signers: Some(vec![]), ..Default::default() };
        let err = builder().create_multiple(EntityKind::Institution, &req).unwrap_err();
        assert!(matches!(err, BuildError::Validation(ref m) if m == "Nothing to create."));
    }
    #[test]
    fn test_delete_certificate_per_kind() {
        let req: CertificateRef =
            serde_json::from_value(json!({"certificateId": "10", "institutionId": 1})).unwrap();
        let actions = builder().delete_certificate(EntityKind::Institution, &req).unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].name, ActionName::DeleteCert);
        assert_eq!(actions[0].data, json!({"id": 10, "institutionid": 1}));

        let req: CertificateRef = serde_json::from_value(json!({"certificateId": 10, "corporateId": 4})).unwrap();
        let actions = builder().delete_certificate(EntityKind::Corporate, &req).unwrap();
        assert_eq!(actions[0].data, json!({"id": 10, "corporateid": 4}));
    }

    #[test]
    fn test_delete_certificate_requires_owner() {
        let req = CertificateRef { certificate_id: Some(10), owner_id: None };
        let err = builder().delete_certificate(EntityKind::Institution, &req).unwrap_err();
        assert!(matches!(err, BuildError::Validation(ref m) if m == "Valid institutionId has not been provided."));
    }

    #[test]
    fn test_add_signers_keeps_flags_and_order() {
        let req: AddSignersRequest = serde_json::from_value(json!({
            "certificateId": 10,
            "institutionId": 1,
            "signers": ["carol", {"name": "dave", "issigned": true}]
        }))
        .unwrap();
        let actions = builder().add_signers(EntityKind::Institution, &req).unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].name, ActionName::AddSigner);
        assert_eq!(
            actions[0].data,
            json!({
                "id": 10,
                "institutionid": 1,
                "signers": [{"name": "carol", "issigned": false}, {"name": "dave", "issigned": true}]
            })
        );
    }

    #[test]
    fn test_add_signers_rejects_empty_list() {
        let req = AddSignersRequest { certificate_id: Some(10), owner_id: Some(1), signers: Some(vec![]) };
        let err = builder().add_signers(EntityKind::Institution, &req).unwrap_err();
        assert!(matches!(err, BuildError::Validation(ref m) if m == "Valid signers have not been provided."));

        let req = AddSignersRequest { signers: None, ..req };
        assert!(builder().add_signers(EntityKind::Institution, &req).is_err());
    }

    #[test]
    fn test_add_signers_rejects_bad_name() {
        let req = AddSignersRequest {
            certificate_id: Some(10),
            owner_id: Some(1),
            signers: Some(vec![SignerInput::Name("Carol!".to_string())]),
        };
        let err = builder().add_signers(EntityKind::Corporate, &req).unwrap_err();
        assert!(matches!(err, BuildError::Validation(_)));
    }

    #[test]
    fn test_create_multiple_without_signers() {
        let req = CreateMultipleRequest {
            institution: Some(CreateEntityRequest { id: Some(1), name: Some("Uni".to_string()) }),
            certificate: Some(certificate(EntityKind::Institution)),
            signers: None,
        };
        let actions = builder().create_multiple(EntityKind::Institution, &req).unwrap();
        let names: Vec<_> = actions.iter().map(|a| a.name).collect();
        assert_eq!(names, vec![ActionName::CreateInst, ActionName::CreateCert]);
    }

    #[test]
    fn test_request_fields_recoverable_from_actions() {
        let cert = builder()
            .create_certificate(EntityKind::Institution, &certificate(EntityKind::Institution))
            .unwrap();
        assert_eq!(
            cert[0].data,
            json!({"id": 10, "institutionid": 1, "certificatename": "Rust", "participants": ["bob", "alice"]})
        );

        let corp = builder()
            .create_certificate(EntityKind::Corporate, &certificate(EntityKind::Corporate))
            .unwrap();
        assert_eq!(
            corp[0].data,
            json!({"id": 10, "corporateid": 1, "certtemplate": "Rust", "assignees": [9, 3]})
        );

        let req: SignCertificateRequest = serde_json::from_value(json!({
            "signer": "alice", "certificateId": 10, "corporateId": 5, "signerPrivate": "x"
        }))
        .unwrap();
        let sign = builder().sign_certificate(EntityKind::Corporate, &req).unwrap();
        assert_eq!(sign[0].data, json!({"id": 10, "corporateid": 5, "signerr": "alice"}));

        let req = CreateEntityRequest { id: Some(3), name: Some("Acme".to_string()) };
        let corp = builder().create_entity(EntityKind::Corporate, &req).unwrap();
        assert_eq!(corp[0].data, json!({"id": 3, "name": "Acme"}));
    }
}
