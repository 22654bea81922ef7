//! The embedded configurator page.

/// Single-page form driving the JSON API with fetch calls.
pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>rotina configurator</title>
<style>
  body { font-family: system-ui, sans-serif; max-width: 720px; margin: 2rem auto; padding: 0 1rem; color: #222; }
  h1 { font-size: 1.4rem; }
  h2 { font-size: 1.05rem; margin-top: 2rem; border-bottom: 1px solid #ddd; padding-bottom: .3rem; }
  label { display: block; margin: .5rem 0 .15rem; font-size: .9rem; }
  input, textarea { width: 100%; padding: .4rem; box-sizing: border-box; }
  button { margin-top: .6rem; padding: .45rem .9rem; cursor: pointer; }
  .row { display: flex; gap: 1rem; }
  .row > div { flex: 1; }
  .preset { display: inline-block; margin: .2rem .8rem .2rem 0; }
  .preset input { width: auto; }
  ul#custom-list { padding-left: 1.2rem; }
  #status { margin-top: 1rem; font-size: .9rem; white-space: pre-wrap; }
  .ok { color: #0a6b2d; }
  .err { color: #a41515; }
</style>
</head>
<body>
<h1>rotina: morning routine configurator</h1>

<h2>1. User</h2>
<div class="row">
  <div><label>Name</label><input id="nome" maxlength="50"></div>
  <div><label>E-mail</label><input id="email" maxlength="100"></div>
</div>
<button onclick="saveProfile()">Save user</button>

<h2>2. Sites to automate</h2>
<div id="presets"></div>
<button onclick="saveSelection()">Save selection</button>

<h2>3. Custom site</h2>
<div class="row">
  <div><label>Name</label><input id="c-nome" maxlength="50"></div>
  <div><label>URL</label><input id="c-url" placeholder="https://sistema.exemplo.com"></div>
</div>
<div class="row">
  <div><label>Login (optional)</label><input id="c-login" maxlength="100"></div>
  <div><label>Senha (optional)</label><input id="c-senha" type="password" maxlength="100"></div>
</div>
<button onclick="addCustom()">Add custom site</button>
<ul id="custom-list"></ul>

<h2>4. Credentials</h2>
<div id="credentials"></div>
<button onclick="saveCredentials()">Save credentials</button>

<h2>5. Reference images</h2>
<div class="row">
  <div><label>Site</label><input id="img-site" maxlength="50"></div>
  <div><label>PNG file</label><input id="img-file" type="file" accept="image/png"></div>
</div>
<label>What should happen after this image is clicked?</label>
<textarea id="img-acao" rows="2"></textarea>
<button onclick="uploadImage()">Upload image</button>

<h2>6. Package</h2>
<button onclick="buildPackage()">Generate installation package (.zip)</button>

<div id="status"></div>

<script>
const status = (msg, ok) => {
  const el = document.getElementById('status');
  el.textContent = msg;
  el.className = ok ? 'ok' : 'err';
};

async function api(path, options) {
  const response = await fetch(path, options);
  const body = await response.json().catch(() => ({}));
  if (!response.ok) throw new Error(body.details || body.error || response.status);
  return body;
}

async function refresh() {
  const state = await api('/api/state');
  const presets = document.getElementById('presets');
  presets.innerHTML = '';
  for (const preset of state.presets) {
    const checked = state.selected.includes(preset.key) ? 'checked' : '';
    presets.insertAdjacentHTML('beforeend',
      `<label class="preset"><input type="checkbox" value="${preset.name}" ${checked}> ${preset.name}</label>`);
  }
  const list = document.getElementById('custom-list');
  list.innerHTML = '';
  state.custom.forEach((site, index) => {
    const item = document.createElement('li');
    item.textContent = `${site.nome} (${site.url}) `;
    const remove = document.createElement('button');
    remove.textContent = 'remove';
    remove.onclick = () => api(`/api/sites/custom/${index}`, { method: 'DELETE' }).then(refresh);
    item.appendChild(remove);
    list.appendChild(item);
  });
  const creds = document.getElementById('credentials');
  creds.innerHTML = '';
  for (const key of state.selected) {
    const preset = state.presets.find(p => p.key === key);
    creds.insertAdjacentHTML('beforeend',
      `<div class="row" data-site="${preset.name}">
         <div><label>${preset.name} login</label><input class="cred-login"></div>
         <div><label>${preset.name} senha</label><input class="cred-senha" type="password"></div>
       </div>`);
  }
}

async function saveProfile() {
  try {
    await api('/api/profile', { method: 'POST', body: JSON.stringify({
      nome: document.getElementById('nome').value,
      email: document.getElementById('email').value }) });
    status('User saved.', true);
  } catch (e) { status('Error: ' + e.message, false); }
}

async function saveSelection() {
  const names = [...document.querySelectorAll('#presets input:checked')].map(i => i.value);
  try {
    await api('/api/sites/select', { method: 'POST', body: JSON.stringify({ sites: names }) });
    status('Selection saved.', true);
    refresh();
  } catch (e) { status('Error: ' + e.message, false); }
}

async function addCustom() {
  try {
    await api('/api/sites/custom', { method: 'POST', body: JSON.stringify({
      nome: document.getElementById('c-nome').value,
      url: document.getElementById('c-url').value,
      login: document.getElementById('c-login').value,
      senha: document.getElementById('c-senha').value }) });
    status('Custom site added.', true);
    refresh();
  } catch (e) { status('Error: ' + e.message, false); }
}

async function saveCredentials() {
  const sites = [...document.querySelectorAll('#credentials [data-site]')].map(row => ({
    site: row.dataset.site,
    login: row.querySelector('.cred-login').value,
    senha: row.querySelector('.cred-senha').value }));
  try {
    const result = await api('/api/credentials', { method: 'POST', body: JSON.stringify({ sites }) });
    status(`Credentials saved (${result.keys} keys).`, true);
  } catch (e) { status('Error: ' + e.message, false); }
}

async function uploadImage() {
  const file = document.getElementById('img-file').files[0];
  const site = document.getElementById('img-site').value;
  if (!file || !site) { status('Pick a site and a PNG file first.', false); return; }
  try {
    const result = await api('/api/images', { method: 'POST', body: file,
      headers: { 'X-Rotina-Site': site, 'X-Rotina-Image': file.name } });
    const acao = document.getElementById('img-acao').value;
    if (acao) {
      await api('/api/images/action', { method: 'POST',
        body: JSON.stringify({ site, image: result.image, acao }) });
    }
    status(`Image '${result.image}' uploaded.`, true);
  } catch (e) { status('Error: ' + e.message, false); }
}

async function buildPackage() {
  status('Generating package...', true);
  const response = await fetch('/api/package', { method: 'POST' });
  if (!response.ok) {
    const body = await response.json().catch(() => ({}));
    status('Error: ' + (body.details || body.error || response.status), false);
    return;
  }
  const blob = await response.blob();
  const link = document.createElement('a');
  link.href = URL.createObjectURL(blob);
  link.download = 'automation_package.zip';
  link.click();
  URL.revokeObjectURL(link.href);
  status('Package downloaded.', true);
}

refresh().catch(e => status('Error: ' + e.message, false));
</script>
</body>
</html>
"#;
